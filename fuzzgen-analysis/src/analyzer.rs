//! Module analysis: root discovery, graph construction, standalone
//! detection and dump assembly.
//!
//! The analyzer never fails loudly; every abort path leaves
//! `ModuleDump::success` unset and logs why.

use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use inkwell::basic_block::BasicBlock;
use inkwell::module::{Linkage as IrLinkage, Module};
use inkwell::types::{AnyType, AnyTypeEnum, BasicTypeEnum, StructType};
use inkwell::values::{
    AnyValueEnum, BasicValue, BasicValueEnum, FunctionValue, GlobalValue, InstructionOpcode,
    InstructionValue, Operand, PointerValue,
};
use log::{debug, error, info, warn};

use crate::cfg::{BlockGraph, FunctionGraph, Graph};
use crate::dump::{ArgumentDump, FunctionDump, Linkage, ModuleDump};
use crate::resolve::TypeResolver;
use crate::types::{BaseKind, StructDump, TypeDump};

/// One-shot analyzer for a parsed IR module.
///
/// The graphs borrow IR objects, so an analyzer never outlives the
/// `Context` the module was parsed in.
pub struct ModuleAnalyzer<'ctx> {
    function_graphs: Vec<FunctionGraph<'ctx>>,
    block_graphs: Vec<BlockGraph<'ctx>>,
    mutable_globals: Vec<GlobalValue<'ctx>>,
    standalone: HashSet<String>,
}

impl<'ctx> ModuleAnalyzer<'ctx> {
    pub fn new() -> Self {
        Self {
            function_graphs: Vec::new(),
            block_graphs: Vec::new(),
            mutable_globals: Vec::new(),
            standalone: HashSet::new(),
        }
    }

    /// Run the full analysis and assemble the dump.
    pub fn analyze(&mut self, module: &Module<'ctx>) -> ModuleDump {
        self.function_graphs.clear();
        self.block_graphs.clear();
        self.mutable_globals.clear();
        self.standalone.clear();

        let mut dump = ModuleDump {
            name: module.get_name().to_string_lossy().into_owned(),
            source_file: module.get_source_file_name().to_string_lossy().into_owned(),
            function_count_total: module.get_functions().count() as u64,
            ..ModuleDump::default()
        };

        if !is_module_legit(&dump.source_file, dump.function_count_total) {
            warn!("module {} failed the sanity check", dump.name);
            return dump;
        }

        let layout = module.get_data_layout();
        let layout_string = layout.as_str().to_string_lossy().into_owned();
        drop(layout);
        let resolver = TypeResolver::from_layout(&layout_string);

        self.mutable_globals = collect_mutable_globals(module);

        info!("constructing control-flow graphs for {}", dump.name);
        if !self.traverse(module) {
            return dump;
        }

        self.standalone = self.find_standalone_functions();
        dump.standalone_count = self.standalone.len() as u64;
        if self.standalone.is_empty() {
            warn!("no standalone functions in {}", dump.name);
            return dump;
        }
        info!("{} standalone function(s) identified", dump.standalone_count);

        dump.functions = self.dump_functions(&resolver);
        if dump.functions.is_empty() {
            error!("graph traversal produced no function dumps");
            return dump;
        }

        dump.standalone_functions = dump
            .functions
            .iter()
            .filter(|function| function.is_standalone)
            .cloned()
            .collect();
        if dump.standalone_functions.len() as u64 != dump.standalone_count {
            error!("standalone bookkeeping out of sync");
            return dump;
        }

        dump.structs = self.dump_structs(module, &resolver);

        dump.success = true;
        dump
    }

    pub fn function_graphs(&self) -> &[FunctionGraph<'ctx>] {
        &self.function_graphs
    }

    pub fn block_graphs(&self) -> &[BlockGraph<'ctx>] {
        &self.block_graphs
    }

    /// Render both graph layers into the debug log.
    pub fn log_graphs(&self) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        for graph in &self.function_graphs {
            for (vertex, successors) in graph.iter() {
                let rendered: Vec<String> = successors
                    .iter()
                    .filter_map(|id| graph.vertex(*id))
                    .map(|v| format!("{}({})", fn_name(v.object), v.id))
                    .collect();
                debug!(
                    "{}({}) -> {}",
                    fn_name(vertex.object),
                    vertex.id,
                    if rendered.is_empty() {
                        "None".to_string()
                    } else {
                        rendered.join(" ")
                    }
                );
            }
        }
        for blocks in &self.block_graphs {
            debug!(
                "block graph of {}: {} block(s)",
                fn_name(blocks.function),
                blocks.graph.vertex_count()
            );
        }
    }

    // --- traversal -------------------------------------------------------

    fn traverse(&mut self, module: &Module<'ctx>) -> bool {
        let roots = find_root_functions(module);
        if roots.is_empty() {
            error!("no root functions found");
            return false;
        }
        info!("{} root function(s) found", roots.len());

        for root in roots {
            self.grow_graphs(module, root, None);
        }

        if self.function_graphs.is_empty() || self.block_graphs.is_empty() {
            error!("graph construction came up empty");
            return false;
        }
        true
    }

    /// Depth-first growth of the per-root function graph; every newly
    /// discovered definition also gets its block graph built.
    fn grow_graphs(
        &mut self,
        module: &Module<'ctx>,
        function: FunctionValue<'ctx>,
        parent: Option<FunctionValue<'ctx>>,
    ) {
        // Declarations stay out of the graphs entirely.
        if function.count_basic_blocks() == 0 {
            return;
        }

        if parent.is_none() {
            self.function_graphs.push(FunctionGraph::new());
        }
        let Some(graph) = self.function_graphs.last_mut() else {
            return;
        };

        // Recursion guard: self-calls and already-known vertices add their
        // edge at most once and are not descended into.
        if parent == Some(function) || graph.contains(function) {
            if let Some(parent_function) = parent {
                if !graph.edge_exists(parent_function, function) {
                    graph.add_edge(parent_function, function);
                }
            }
            return;
        }

        graph.add_vertex(function);
        if let Some(parent_function) = parent {
            graph.add_edge(parent_function, function);
        }

        self.walk_blocks(module, function);
    }

    /// Breadth-first walk over the function body: builds the block graph
    /// and recurses into every direct callee found on the way.
    fn walk_blocks(&mut self, module: &Module<'ctx>, function: FunctionValue<'ctx>) {
        let blocks = function.get_basic_blocks();

        // Reserve the slot up front so block graphs appear in discovery
        // order even though callees finish first.
        let slot = self.block_graphs.len();
        self.block_graphs.push(BlockGraph {
            function,
            graph: Graph::new(),
        });

        let mut graph: Graph<BasicBlock<'ctx>> = Graph::new();
        for block in &blocks {
            graph.add_vertex(*block);
        }

        let Some(entry) = blocks.first().copied() else {
            return;
        };

        let mut visited = vec![false; blocks.len()];
        let mut queue: VecDeque<BasicBlock<'ctx>> = VecDeque::new();
        if let Some(id) = graph.vertex_id(entry) {
            visited[id as usize] = true;
        }
        queue.push_back(entry);

        while let Some(block) = queue.pop_front() {
            for instruction in block.get_instructions() {
                if let Some(callee) = direct_callee(module, &instruction) {
                    self.grow_graphs(module, callee, Some(function));
                }
            }

            let Some(terminator) = block.get_terminator() else {
                continue;
            };
            for successor in block_successors(&terminator) {
                graph.add_edge(block, successor);

                let Some(id) = graph.vertex_id(successor) else {
                    continue;
                };
                if visited[id as usize] {
                    continue;
                }
                visited[id as usize] = true;
                queue.push_back(successor);
            }
        }

        if let Some(entry_slot) = self.block_graphs.get_mut(slot) {
            entry_slot.graph = graph;
        }
    }

    // --- standalone detection --------------------------------------------

    /// Union over all function graphs of the vertices that pass both the
    /// function filter and the global filter.
    fn find_standalone_functions(&self) -> HashSet<String> {
        let mut all = HashSet::new();

        for graph in &self.function_graphs {
            if graph.is_empty() {
                continue;
            }

            // Function filter: no calls into other defined functions.
            let mut candidates: Vec<FunctionValue<'ctx>> = graph
                .iter()
                .filter(|(_, successors)| successors.is_empty())
                .map(|(vertex, _)| vertex.object)
                .collect();

            // Global filter: touching a mutable module global disqualifies.
            for global in &self.mutable_globals {
                for user in instruction_user_functions(global) {
                    candidates.retain(|candidate| *candidate != user);
                }
            }

            for candidate in candidates {
                all.insert(fn_name(candidate));
            }
        }

        all
    }

    // --- dump assembly ---------------------------------------------------

    /// Dump every function discovered in any graph, first seen wins.
    fn dump_functions(&self, resolver: &TypeResolver) -> Vec<Rc<FunctionDump>> {
        let mut registered: HashSet<String> = HashSet::new();
        let mut dumps = Vec::new();

        for graph in &self.function_graphs {
            for vertex in graph.vertices() {
                let name = fn_name(vertex.object);
                if !registered.insert(name) {
                    continue;
                }
                dumps.push(Rc::new(self.dump_function(vertex.object, resolver)));
            }
        }

        dumps
    }

    fn dump_function(&self, function: FunctionValue<'ctx>, resolver: &TypeResolver) -> FunctionDump {
        let fn_type = function.get_type();
        let name = fn_name(function);

        let return_type = match fn_type.get_return_type() {
            Some(ty) => resolver.resolve_basic(ty),
            None => TypeDump::plain(BaseKind::Void, 0),
        };

        let arguments = function
            .get_params()
            .iter()
            .enumerate()
            .map(|(index, param)| ArgumentDump {
                index: index as u16,
                ty: resolver.resolve_basic(param.get_type()),
            })
            .collect();

        FunctionDump {
            is_standalone: self.standalone.contains(&name),
            name,
            return_type,
            arguments,
            arguments_fixed: !fn_type.is_var_arg(),
            is_local: function.count_basic_blocks() > 0,
            linkage: convert_linkage(function.get_linkage()),
        }
    }

    /// Sweep the module for named struct types and dump each definition
    /// once, in first-discovery order. Fields are chased to a fixpoint so
    /// nested definitions are not missed.
    fn dump_structs(&self, module: &Module<'ctx>, resolver: &TypeResolver) -> Vec<StructDump> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut pending: VecDeque<StructType<'ctx>> = VecDeque::new();
        let mut order: Vec<StructType<'ctx>> = Vec::new();

        let mut enqueue = |strukt: StructType<'ctx>,
                           seen: &mut HashSet<String>,
                           pending: &mut VecDeque<StructType<'ctx>>| {
            if let Some(name) = strukt.get_name() {
                if seen.insert(name.to_string_lossy().into_owned()) {
                    pending.push_back(strukt);
                }
            }
        };

        for function in module.get_functions() {
            let fn_type = function.get_type();
            let mut signature: Vec<BasicTypeEnum> = fn_type
                .get_param_types()
                .into_iter()
                .filter_map(|ty| BasicTypeEnum::try_from(ty).ok())
                .collect();
            if let Some(return_type) = fn_type.get_return_type() {
                signature.push(return_type);
            }
            for ty in signature {
                if let Some(strukt) = named_struct(ty.as_any_type_enum()) {
                    enqueue(strukt, &mut seen, &mut pending);
                }
            }
        }
        for global in module.get_globals() {
            let pointer_type = global.as_pointer_value().get_type();
            if let Some(strukt) = named_struct(pointer_type.as_any_type_enum()) {
                enqueue(strukt, &mut seen, &mut pending);
            }
        }

        while let Some(strukt) = pending.pop_front() {
            order.push(strukt);
            if strukt.is_opaque() {
                continue;
            }
            for index in 0..strukt.count_fields() {
                if let Some(field) = strukt.get_field_type_at_index(index) {
                    if let Some(nested) = named_struct(field.as_any_type_enum()) {
                        enqueue(nested, &mut seen, &mut pending);
                    }
                }
            }
        }

        order
            .into_iter()
            .map(|strukt| resolver.resolve_struct_definition(strukt))
            .collect()
    }
}

impl<'ctx> Default for ModuleAnalyzer<'ctx> {
    fn default() -> Self {
        Self::new()
    }
}

// --- module-level helpers ------------------------------------------------

/// A module is analyzable when it records its source file and actually
/// contains functions.
fn is_module_legit(source_file: &str, function_count: u64) -> bool {
    !source_file.is_empty() && function_count > 0
}

/// Non-constant globals defined in this module. Touching one of these
/// disqualifies a function from being standalone.
fn collect_mutable_globals<'ctx>(module: &Module<'ctx>) -> Vec<GlobalValue<'ctx>> {
    module
        .get_globals()
        .filter(|global| !global.is_constant() && !global.is_declaration())
        .collect()
}

/// A root calls into some subgraph and is itself unreferenced: no uses in
/// the module, a definition, external linkage, never named as a callee and
/// never stored as a function pointer.
fn find_root_functions<'ctx>(module: &Module<'ctx>) -> Vec<FunctionValue<'ctx>> {
    let mut cross_referenced: HashSet<String> = HashSet::new();
    let mut pointer_escaped: HashSet<String> = HashSet::new();

    // First lap: record every direct callee and every function whose
    // address is written somewhere.
    for function in module.get_functions() {
        for block in function.get_basic_blocks() {
            for instruction in block.get_instructions() {
                match instruction.get_opcode() {
                    InstructionOpcode::Call => {
                        if let Some(callee) = direct_callee(module, &instruction) {
                            cross_referenced.insert(fn_name(callee));
                        }
                    }
                    InstructionOpcode::Store => {
                        if let Some(stored) = stored_function(module, &instruction) {
                            pointer_escaped.insert(fn_name(stored));
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    // Second lap: apply the filters.
    let mut roots = Vec::new();
    for function in module.get_functions() {
        if reference_count(function) != 0 {
            continue;
        }
        if function.count_basic_blocks() == 0 {
            continue;
        }
        if function.get_linkage() != IrLinkage::External {
            continue;
        }
        let name = fn_name(function);
        if cross_referenced.contains(&name) || pointer_escaped.contains(&name) {
            continue;
        }
        roots.push(function);
    }
    roots
}

fn fn_name(function: FunctionValue) -> String {
    function.get_name().to_string_lossy().into_owned()
}

/// Direct callee of a call instruction; `None` for anything indirect.
fn direct_callee<'ctx>(
    module: &Module<'ctx>,
    instruction: &InstructionValue<'ctx>,
) -> Option<FunctionValue<'ctx>> {
    if instruction.get_opcode() != InstructionOpcode::Call {
        return None;
    }
    let operand_count = instruction.get_num_operands();
    if operand_count == 0 {
        return None;
    }
    // The callee is the trailing operand.
    match instruction.get_operand(operand_count - 1) {
        Some(Operand::Value(BasicValueEnum::PointerValue(pointer))) => {
            function_behind_pointer(module, pointer)
        }
        _ => None,
    }
}

/// A store whose stored value is the address of a module function.
fn stored_function<'ctx>(
    module: &Module<'ctx>,
    instruction: &InstructionValue<'ctx>,
) -> Option<FunctionValue<'ctx>> {
    if instruction.get_opcode() != InstructionOpcode::Store {
        return None;
    }
    match instruction.get_operand(0) {
        Some(Operand::Value(BasicValueEnum::PointerValue(pointer))) => {
            function_behind_pointer(module, pointer)
        }
        _ => None,
    }
}

/// Map a pointer operand back onto a module function, if it is one.
fn function_behind_pointer<'ctx>(
    module: &Module<'ctx>,
    pointer: PointerValue<'ctx>,
) -> Option<FunctionValue<'ctx>> {
    let name = pointer.get_name().to_str().ok()?;
    if name.is_empty() {
        // An SSA temporary, not a symbol.
        return None;
    }
    let function = module.get_function(name)?;
    if function.as_global_value().as_pointer_value() == pointer {
        Some(function)
    } else {
        None
    }
}

/// Number of uses of the function value anywhere in the module.
fn reference_count(function: FunctionValue) -> u32 {
    let mut count = 0;
    let mut current = function.as_global_value().as_pointer_value().get_first_use();
    while let Some(usage) = current {
        count += 1;
        current = usage.get_next_use();
    }
    count
}

/// Parent functions of every instruction that uses the global directly.
fn instruction_user_functions<'ctx>(global: &GlobalValue<'ctx>) -> Vec<FunctionValue<'ctx>> {
    let mut parents = Vec::new();
    let mut current = global.as_pointer_value().get_first_use();
    while let Some(usage) = current {
        if let AnyValueEnum::InstructionValue(instruction) = usage.get_user() {
            if let Some(parent) = instruction.get_parent().and_then(|block| block.get_parent()) {
                parents.push(parent);
            }
        }
        current = usage.get_next_use();
    }
    parents
}

/// Successor blocks named by a terminator's operands.
fn block_successors<'ctx>(terminator: &InstructionValue<'ctx>) -> Vec<BasicBlock<'ctx>> {
    let mut successors = Vec::new();
    for index in 0..terminator.get_num_operands() {
        if let Some(Operand::Block(block)) = terminator.get_operand(index) {
            successors.push(block);
        }
    }
    successors
}

fn named_struct(mut ty: AnyTypeEnum) -> Option<StructType> {
    while let AnyTypeEnum::PointerType(pointer) = ty {
        ty = pointer.get_element_type();
    }
    match ty {
        AnyTypeEnum::StructType(strukt) if strukt.get_name().is_some() => Some(strukt),
        _ => None,
    }
}

fn convert_linkage(linkage: IrLinkage) -> Linkage {
    match linkage {
        IrLinkage::External => Linkage::External,
        IrLinkage::Internal | IrLinkage::Private => Linkage::Internal,
        _ => Linkage::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;
    use inkwell::AddressSpace;

    fn fresh_module<'ctx>(context: &'ctx Context) -> Module<'ctx> {
        let module = context.create_module("unit");
        module.set_source_file_name("unit.c");
        module
    }

    /// Define `name` with a single block that calls `callees` in order and
    /// returns.
    fn define_calling<'ctx>(
        context: &'ctx Context,
        module: &Module<'ctx>,
        name: &str,
        callees: &[FunctionValue<'ctx>],
    ) -> FunctionValue<'ctx> {
        let function = module.add_function(name, context.void_type().fn_type(&[], false), None);
        let entry = context.append_basic_block(function, "entry");
        let builder = context.create_builder();
        builder.position_at_end(entry);
        for callee in callees {
            builder.build_call(*callee, &[], "").unwrap();
        }
        builder.build_return(None).unwrap();
        function
    }

    #[test]
    fn leaves_are_standalone_and_callers_are_not() {
        let context = Context::create();
        let module = fresh_module(&context);

        let a = define_calling(&context, &module, "a", &[]);
        let b = define_calling(&context, &module, "b", &[]);
        let middle = define_calling(&context, &module, "middle", &[a]);
        let _root = define_calling(&context, &module, "root", &[middle, b]);

        let mut analyzer = ModuleAnalyzer::new();
        let dump = analyzer.analyze(&module);

        assert!(dump.success);
        assert_eq!(dump.function_count_total, 4);
        assert_eq!(dump.functions.len(), 4);
        assert_eq!(dump.standalone_count, 2);

        let standalone: Vec<&str> = dump
            .standalone_functions
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert!(standalone.contains(&"a"));
        assert!(standalone.contains(&"b"));

        // CFG closure spot check: the edges mirror real call sites.
        let graph = &analyzer.function_graphs()[0];
        assert!(graph.edge_exists(middle, a));
        assert!(!graph.edge_exists(a, middle));
    }

    #[test]
    fn touching_a_mutable_global_disqualifies() {
        let context = Context::create();
        let module = fresh_module(&context);

        let global = module.add_global(context.i32_type(), None, "counter");
        global.set_initializer(&context.i32_type().const_int(0, false));

        let clean = define_calling(&context, &module, "clean", &[]);

        let dirty = module.add_function("dirty", context.void_type().fn_type(&[], false), None);
        let entry = context.append_basic_block(dirty, "entry");
        let builder = context.create_builder();
        builder.position_at_end(entry);
        builder
            .build_load(global.as_pointer_value(), "v")
            .unwrap();
        builder.build_return(None).unwrap();

        let _root = define_calling(&context, &module, "root", &[clean, dirty]);

        let mut analyzer = ModuleAnalyzer::new();
        let dump = analyzer.analyze(&module);

        assert!(dump.success);
        assert_eq!(dump.standalone_count, 1);
        assert_eq!(dump.standalone_functions[0].name, "clean");

        let dirty_dump = dump
            .functions
            .iter()
            .find(|f| f.name == "dirty")
            .unwrap();
        assert!(!dirty_dump.is_standalone);
    }

    #[test]
    fn constant_globals_do_not_disqualify() {
        let context = Context::create();
        let module = fresh_module(&context);

        let literal = module.add_global(context.i8_type().array_type(3), None, ".str");
        literal.set_initializer(&context.i8_type().const_array(&[
            context.i8_type().const_int(104, false),
            context.i8_type().const_int(105, false),
            context.i8_type().const_int(0, false),
        ]));
        literal.set_constant(true);

        let user = module.add_function("user", context.void_type().fn_type(&[], false), None);
        let entry = context.append_basic_block(user, "entry");
        let builder = context.create_builder();
        builder.position_at_end(entry);
        builder
            .build_load(literal.as_pointer_value(), "bytes")
            .unwrap();
        builder.build_return(None).unwrap();

        let _root = define_calling(&context, &module, "root", &[user]);

        let mut analyzer = ModuleAnalyzer::new();
        let dump = analyzer.analyze(&module);

        assert!(dump.success);
        let user_dump = dump.functions.iter().find(|f| f.name == "user").unwrap();
        assert!(user_dump.is_standalone);
    }

    #[test]
    fn single_function_module_is_its_own_root() {
        let context = Context::create();
        let module = fresh_module(&context);
        let only = define_calling(&context, &module, "only", &[]);

        let mut analyzer = ModuleAnalyzer::new();
        let dump = analyzer.analyze(&module);

        assert!(dump.success);
        assert_eq!(dump.standalone_count, 1);
        assert_eq!(dump.standalone_functions[0].name, "only");

        let graph = &analyzer.function_graphs()[0];
        assert_eq!(graph.vertex_count(), 1);
        assert!(graph.successors_of(graph.vertex_id(only).unwrap()).is_empty());
    }

    #[test]
    fn mutually_referencing_functions_leave_no_root() {
        let context = Context::create();
        let module = fresh_module(&context);

        let f = module.add_function("f", context.void_type().fn_type(&[], false), None);
        let g = module.add_function("g", context.void_type().fn_type(&[], false), None);
        let builder = context.create_builder();
        for (function, callee) in [(f, g), (g, f)] {
            let entry = context.append_basic_block(function, "entry");
            builder.position_at_end(entry);
            builder.build_call(callee, &[], "").unwrap();
            builder.build_return(None).unwrap();
        }

        let mut analyzer = ModuleAnalyzer::new();
        let dump = analyzer.analyze(&module);

        assert!(!dump.success);
    }

    #[test]
    fn recursion_adds_edges_without_duplicating_vertices() {
        let context = Context::create();
        let module = fresh_module(&context);

        let f = module.add_function("f", context.void_type().fn_type(&[], false), None);
        let g = module.add_function("g", context.void_type().fn_type(&[], false), None);
        let builder = context.create_builder();
        for (function, callee) in [(f, g), (g, f)] {
            let entry = context.append_basic_block(function, "entry");
            builder.position_at_end(entry);
            builder.build_call(callee, &[], "").unwrap();
            builder.build_return(None).unwrap();
        }
        let root = define_calling(&context, &module, "root", &[f]);

        let mut analyzer = ModuleAnalyzer::new();
        let dump = analyzer.analyze(&module);

        // The cycle means nothing qualifies as standalone, but the graph
        // shape must still be right: three vertices, a back edge, no
        // duplicates.
        assert!(!dump.success);
        let graph = &analyzer.function_graphs()[0];
        assert_eq!(graph.vertex_count(), 3);
        assert!(graph.edge_exists(root, f));
        assert!(graph.edge_exists(f, g));
        assert!(graph.edge_exists(g, f));
        assert_eq!(graph.successors_of(graph.vertex_id(g).unwrap()), &[graph.vertex_id(f).unwrap()]);
    }

    #[test]
    fn calls_to_declarations_do_not_create_edges() {
        let context = Context::create();
        let module = fresh_module(&context);

        let external = module.add_function(
            "write_out",
            context.void_type().fn_type(&[], false),
            None,
        );
        let root = define_calling(&context, &module, "root", &[external]);

        let mut analyzer = ModuleAnalyzer::new();
        let dump = analyzer.analyze(&module);

        // The extern call neither adds a vertex nor an edge, so the root
        // itself is a leaf and standalone.
        assert!(dump.success);
        assert_eq!(dump.standalone_functions[0].name, "root");

        let graph = &analyzer.function_graphs()[0];
        assert_eq!(graph.vertex_count(), 1);
        assert!(graph.successors_of(graph.vertex_id(root).unwrap()).is_empty());
    }

    #[test]
    fn stored_function_addresses_are_tolerated() {
        let context = Context::create();
        let module = fresh_module(&context);

        let handler = define_calling(&context, &module, "handler", &[]);

        let dispatch =
            module.add_function("dispatch", context.void_type().fn_type(&[], false), None);
        let entry = context.append_basic_block(dispatch, "entry");
        let builder = context.create_builder();
        builder.position_at_end(entry);
        let slot = builder
            .build_alloca(handler.get_type().ptr_type(AddressSpace::default()), "slot")
            .unwrap();
        builder
            .build_store(slot, handler.as_global_value().as_pointer_value())
            .unwrap();
        builder.build_return(None).unwrap();

        let mut analyzer = ModuleAnalyzer::new();
        let dump = analyzer.analyze(&module);

        // dispatch is the only root and, with no direct calls, the only
        // discovered function; the escaped handler never enters a graph.
        assert!(dump.success);
        assert_eq!(dump.functions.len(), 1);
        assert_eq!(dump.standalone_functions[0].name, "dispatch");
    }

    #[test]
    fn struct_parameters_surface_as_references_with_one_definition() {
        let context = Context::create();
        let module = fresh_module(&context);

        let pair = context.opaque_struct_type("pair");
        pair.set_body(
            &[context.i32_type().into(), context.i32_type().into()],
            false,
        );
        let pair_ptr = pair.ptr_type(AddressSpace::default());

        let function = module.add_function(
            "use_pair",
            context.void_type().fn_type(&[pair_ptr.into()], false),
            None,
        );
        let entry = context.append_basic_block(function, "entry");
        let builder = context.create_builder();
        builder.position_at_end(entry);
        builder.build_return(None).unwrap();

        let mut analyzer = ModuleAnalyzer::new();
        let dump = analyzer.analyze(&module);

        assert!(dump.success);
        assert_eq!(dump.structs.len(), 1);
        assert!(dump.structs[0].is_definition);
        assert_eq!(dump.structs[0].name, "pair");

        let target = &dump.standalone_functions[0];
        let argument = target.arguments[0].ty.as_struct().unwrap();
        assert!(!argument.is_definition);
        assert_eq!(argument.name, "pair");
        assert_eq!(target.arguments[0].ty.pointer_depth(), 1);
    }

    #[test]
    fn branching_function_gets_a_complete_block_graph() {
        let context = Context::create();
        let module = fresh_module(&context);

        let function =
            module.add_function("branchy", context.void_type().fn_type(&[], false), None);
        let entry = context.append_basic_block(function, "entry");
        let then_block = context.append_basic_block(function, "then");
        let else_block = context.append_basic_block(function, "else");
        let exit = context.append_basic_block(function, "exit");

        let builder = context.create_builder();
        builder.position_at_end(entry);
        let flag = context.bool_type().const_int(1, false);
        builder
            .build_conditional_branch(flag, then_block, else_block)
            .unwrap();
        builder.position_at_end(then_block);
        builder.build_unconditional_branch(exit).unwrap();
        builder.position_at_end(else_block);
        builder.build_unconditional_branch(exit).unwrap();
        builder.position_at_end(exit);
        builder.build_return(None).unwrap();

        let mut analyzer = ModuleAnalyzer::new();
        let dump = analyzer.analyze(&module);
        assert!(dump.success);

        let blocks = &analyzer.block_graphs()[0];
        assert_eq!(fn_name(blocks.function), "branchy");
        assert_eq!(blocks.graph.vertex_count(), 4);
        assert!(blocks.graph.edge_exists(entry, then_block));
        assert!(blocks.graph.edge_exists(entry, else_block));
        assert!(blocks.graph.edge_exists(then_block, exit));
        assert!(blocks.graph.edge_exists(else_block, exit));
        assert!(!blocks.graph.edge_exists(exit, entry));
    }

    #[test]
    fn legitimacy_requires_a_source_file_and_functions() {
        let context = Context::create();
        let module = context.create_module("empty");
        module.set_source_file_name("empty.c");

        let mut analyzer = ModuleAnalyzer::new();
        let dump = analyzer.analyze(&module);
        assert!(!dump.success);
        assert_eq!(dump.function_count_total, 0);
    }
}
