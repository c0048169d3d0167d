//! Symbol-name repair for separately compiled drivers.
//!
//! The driver re-declares the target under its plain name; compiled as C++
//! that declaration gets mangled, while the sanitized target module
//! exports the plain symbol. This pass renames the mangled declaration
//! (and the call sites that resolve to it) back to the plain name so the
//! final link sees one symbol.

use inkwell::module::Module;
use inkwell::values::{AnyValueEnum, BasicValue, FunctionValue, InstructionOpcode};
use log::{debug, error};

use fuzzgen_analysis::FunctionDump;

pub struct NameCorrector<'dump> {
    target: &'dump FunctionDump,
}

impl<'dump> NameCorrector<'dump> {
    pub fn new(target: &'dump FunctionDump) -> Self {
        Self { target }
    }

    /// Rename the matching declaration and its callers, then verify.
    /// Running this on an already-correct module is a no-op.
    pub fn run(&self, module: &Module<'_>) -> bool {
        let Some(declaration) = self.find_mangled_declaration(module) else {
            error!(
                "no declaration matching {} in the driver module",
                self.target.name
            );
            return false;
        };

        // Call sites first, declaration second; both resolve to the same
        // IR object, so repeating the rename is harmless.
        let mut current = declaration
            .as_global_value()
            .as_pointer_value()
            .get_first_use();
        while let Some(usage) = current {
            if let AnyValueEnum::InstructionValue(instruction) = usage.get_user() {
                if instruction.get_opcode() == InstructionOpcode::Call {
                    declaration.as_global_value().set_name(&self.target.name);
                }
            }
            current = usage.get_next_use();
        }
        declaration.as_global_value().set_name(&self.target.name);

        match module.verify() {
            Ok(()) => true,
            Err(message) => {
                debug!(
                    "verifier rejected the corrected module: {}",
                    message.to_string()
                );
                false
            }
        }
    }

    /// The declaration whose (possibly mangled) name contains the plain
    /// target name. An exact match qualifies too, which is what makes the
    /// pass idempotent.
    fn find_mangled_declaration<'ctx>(
        &self,
        module: &Module<'ctx>,
    ) -> Option<FunctionValue<'ctx>> {
        module.get_functions().find(|function| {
            function.count_basic_blocks() == 0
                && function
                    .get_name()
                    .to_string_lossy()
                    .contains(&self.target.name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuzzgen_analysis::{BaseKind, Linkage, TypeDump};
    use inkwell::context::Context;
    use inkwell::AddressSpace;

    fn dump_for(name: &str) -> FunctionDump {
        FunctionDump {
            name: name.into(),
            return_type: TypeDump::plain(BaseKind::Void, 0),
            arguments: Vec::new(),
            arguments_fixed: true,
            is_local: true,
            is_standalone: true,
            linkage: Linkage::External,
        }
    }

    /// A driver-shaped module: mangled declaration plus an entry point
    /// calling it.
    fn build_driver<'ctx>(context: &'ctx Context, declared_name: &str) -> Module<'ctx> {
        let module = context.create_module("driver");
        let builder = context.create_builder();

        let i8_ptr = context.i8_type().ptr_type(AddressSpace::default());
        let mangled = module.add_function(
            declared_name,
            context.i32_type().fn_type(&[i8_ptr.into()], false),
            None,
        );

        let entry_type = context
            .i32_type()
            .fn_type(&[i8_ptr.into(), context.i64_type().into()], false);
        let entry_point = module.add_function("LLVMFuzzerTestOneInput", entry_type, None);
        let entry = context.append_basic_block(entry_point, "entry");
        builder.position_at_end(entry);
        let data = entry_point.get_nth_param(0).unwrap();
        builder
            .build_call(mangled, &[data.into()], "call")
            .unwrap();
        builder
            .build_return(Some(&context.i32_type().const_int(0, false)))
            .unwrap();

        module
    }

    #[test]
    fn mangled_declaration_is_renamed() {
        let context = Context::create();
        let module = build_driver(&context, "_Z6targetPKc");
        let dump = dump_for("target");

        assert!(NameCorrector::new(&dump).run(&module));

        assert!(module.get_function("target").is_some());
        assert!(module.get_function("_Z6targetPKc").is_none());
        assert!(module.verify().is_ok());
    }

    #[test]
    fn correction_is_idempotent() {
        let context = Context::create();
        let module = build_driver(&context, "_Z6targetPKc");
        let dump = dump_for("target");

        assert!(NameCorrector::new(&dump).run(&module));
        assert!(NameCorrector::new(&dump).run(&module));

        assert!(module.get_function("target").is_some());
        assert!(module.verify().is_ok());
    }

    #[test]
    fn plain_c_names_pass_through() {
        let context = Context::create();
        let module = build_driver(&context, "target");
        let dump = dump_for("target");

        assert!(NameCorrector::new(&dump).run(&module));
        assert!(module.get_function("target").is_some());
    }

    #[test]
    fn missing_declaration_aborts() {
        let context = Context::create();
        let module = context.create_module("empty");
        let dump = dump_for("target");

        assert!(!NameCorrector::new(&dump).run(&module));
    }
}
