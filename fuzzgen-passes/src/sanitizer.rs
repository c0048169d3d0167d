//! Target isolation.
//!
//! Strips a module copy down to one target function, the declarations that
//! function actually calls and, in shallow mode, the original globals. The
//! module must verify afterwards; the caller decides what to do when it
//! does not.

use inkwell::module::{Linkage as IrLinkage, Module};
use inkwell::values::{
    AnyValueEnum, BasicValue, BasicValueUse, FunctionValue, GlobalValue, InstructionValue,
    PointerValue,
};
use log::{debug, error};

use fuzzgen_analysis::{FunctionDump, Linkage};

/// How far a constant-expression chain is followed before giving up and
/// keeping the global.
const CONSTANT_CHAIN_DEPTH: u8 = 8;

pub struct Sanitizer<'dump> {
    target: &'dump FunctionDump,
    deep: bool,
}

impl<'dump> Sanitizer<'dump> {
    pub fn new(target: &'dump FunctionDump, deep: bool) -> Self {
        Self { target, deep }
    }

    /// In-place module surgery. Returns whether the stripped module
    /// verifies.
    pub fn run(&self, module: &Module<'_>) -> bool {
        let Some(target_function) = module.get_function(&self.target.name) else {
            error!("target {} is missing from the module", self.target.name);
            return false;
        };

        if self.deep {
            for global in self.globals_to_delete(module) {
                erase_global(global);
            }
        }

        for function in self.functions_to_delete(module, target_function) {
            erase_function(function);
        }

        // The target must stay linkable once it is compiled separately.
        if self.target.linkage == Linkage::Internal {
            target_function.set_linkage(IrLinkage::External);
        }

        match module.verify() {
            Ok(()) => true,
            Err(message) => {
                debug!(
                    "verifier rejected the sanitized module: {}",
                    message.to_string()
                );
                false
            }
        }
    }

    /// Everything that is not the target and not a declaration the target
    /// calls.
    fn functions_to_delete<'ctx>(
        &self,
        module: &Module<'ctx>,
        target_function: FunctionValue<'ctx>,
    ) -> Vec<FunctionValue<'ctx>> {
        let mut doomed = Vec::new();
        for function in module.get_functions() {
            if function == target_function {
                continue;
            }
            let is_declaration = function.count_basic_blocks() == 0;
            if is_declaration && self.used_by_target(function) {
                continue;
            }
            doomed.push(function);
        }
        doomed
    }

    fn used_by_target(&self, function: FunctionValue<'_>) -> bool {
        let mut current = function.as_global_value().as_pointer_value().get_first_use();
        while let Some(usage) = current {
            if let AnyValueEnum::InstructionValue(instruction) = usage.get_user() {
                if self.instruction_in_target(instruction) {
                    return true;
                }
            }
            current = usage.get_next_use();
        }
        false
    }

    /// Globals whose uses never reach the target.
    fn globals_to_delete<'ctx>(&self, module: &Module<'ctx>) -> Vec<GlobalValue<'ctx>> {
        module
            .get_globals()
            .filter(|global| !self.reaches_target(module, *global))
            .collect()
    }

    /// A global survives when at least one of its uses ends up inside the
    /// target: either directly through an instruction, or through a
    /// constant-expression chain (string literals, constant aggregates).
    /// A global with no uses at all is not needed by anyone.
    fn reaches_target<'ctx>(&self, module: &Module<'ctx>, global: GlobalValue<'ctx>) -> bool {
        self.value_reaches_target(module, global.as_pointer_value().into(), CONSTANT_CHAIN_DEPTH)
    }

    /// Whether any use of `value` eventually lands in an instruction
    /// inside the target. Constant-expression chains and constant
    /// aggregate initializers are followed; the depth bound keeps cyclic
    /// constant graphs from recursing forever and errs toward keeping.
    fn value_reaches_target<'ctx>(
        &self,
        module: &Module<'ctx>,
        value: AnyValueEnum<'ctx>,
        depth: u8,
    ) -> bool {
        if depth == 0 {
            return true;
        }
        let mut current = first_use_of(value);
        while let Some(usage) = current {
            let user = usage.get_user();
            let hit = match user {
                AnyValueEnum::InstructionValue(instruction) => {
                    self.instruction_in_target(instruction)
                }
                AnyValueEnum::PointerValue(pointer) => {
                    match global_behind_pointer(module, pointer) {
                        // `value` initializes another global; judge that
                        // one by its own uses.
                        Some(owner) => self.value_reaches_target(
                            module,
                            owner.as_pointer_value().into(),
                            depth - 1,
                        ),
                        None => self.value_reaches_target(module, user, depth - 1),
                    }
                }
                _ => self.value_reaches_target(module, user, depth - 1),
            };
            if hit {
                return true;
            }
            current = usage.get_next_use();
        }
        false
    }

    fn instruction_in_target(&self, instruction: InstructionValue<'_>) -> bool {
        instruction
            .get_parent()
            .and_then(|block| block.get_parent())
            .map(|function| function.get_name().to_string_lossy() == self.target.name)
            .unwrap_or(false)
    }
}

/// Detach remaining uses, then delete; erase order cannot matter after
/// that. Doomed bodies disappear with their owners and the verifier has
/// the final word.
fn erase_function(function: FunctionValue<'_>) {
    let pointer = function.as_global_value().as_pointer_value();
    let undef = pointer.get_type().get_undef();
    pointer.replace_all_uses_with(undef);
    unsafe { function.delete() };
}

fn erase_global(global: GlobalValue<'_>) {
    let pointer = global.as_pointer_value();
    let undef = pointer.get_type().get_undef();
    pointer.replace_all_uses_with(undef);
    unsafe { global.delete() };
}

fn first_use_of(value: AnyValueEnum<'_>) -> Option<BasicValueUse<'_>> {
    match value {
        AnyValueEnum::ArrayValue(v) => v.get_first_use(),
        AnyValueEnum::IntValue(v) => v.get_first_use(),
        AnyValueEnum::FloatValue(v) => v.get_first_use(),
        AnyValueEnum::PointerValue(v) => v.get_first_use(),
        AnyValueEnum::StructValue(v) => v.get_first_use(),
        AnyValueEnum::VectorValue(v) => v.get_first_use(),
        AnyValueEnum::FunctionValue(v) => v.as_global_value().as_pointer_value().get_first_use(),
        _ => None,
    }
}

fn global_behind_pointer<'ctx>(
    module: &Module<'ctx>,
    pointer: PointerValue<'ctx>,
) -> Option<GlobalValue<'ctx>> {
    module
        .get_globals()
        .find(|global| global.as_pointer_value() == pointer)
}
