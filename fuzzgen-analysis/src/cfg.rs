//! Adjacency-list graphs over borrowed IR objects.
//!
//! Vertices live in a dense arena; a vertex id is its insertion index, so
//! identity is trivial and the IR handle never owns anything. Successor
//! lists keep first-seen order.

use inkwell::basic_block::BasicBlock;
use inkwell::values::FunctionValue;

/// A vertex: a dense id plus a non-owning handle to the IR object.
#[derive(Debug, Clone, Copy)]
pub struct Vertex<T> {
    pub id: u32,
    pub object: T,
}

#[derive(Debug)]
pub struct Graph<T> {
    vertices: Vec<Vertex<T>>,
    successors: Vec<Vec<u32>>,
}

impl<T: Copy + PartialEq> Graph<T> {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            successors: Vec::new(),
        }
    }

    /// Register a vertex; ids are handed out in insertion order.
    pub fn add_vertex(&mut self, object: T) -> u32 {
        let id = self.vertices.len() as u32;
        self.vertices.push(Vertex { id, object });
        self.successors.push(Vec::new());
        id
    }

    pub fn vertex_id(&self, object: T) -> Option<u32> {
        self.vertices
            .iter()
            .find(|vertex| vertex.object == object)
            .map(|vertex| vertex.id)
    }

    pub fn contains(&self, object: T) -> bool {
        self.vertex_id(object).is_some()
    }

    /// Add the edge `(from, to)`. Unregistered endpoints drop the edge.
    pub fn add_edge(&mut self, from: T, to: T) {
        let (Some(from_id), Some(to_id)) = (self.vertex_id(from), self.vertex_id(to)) else {
            return;
        };
        if let Some(list) = self.successors.get_mut(from_id as usize) {
            list.push(to_id);
        }
    }

    pub fn edge_exists(&self, from: T, to: T) -> bool {
        match (self.vertex_id(from), self.vertex_id(to)) {
            (Some(from_id), Some(to_id)) => self.successors_of(from_id).contains(&to_id),
            _ => false,
        }
    }

    pub fn successors_of(&self, id: u32) -> &[u32] {
        self.successors
            .get(id as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn vertex(&self, id: u32) -> Option<&Vertex<T>> {
        self.vertices.get(id as usize)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex<T>> {
        self.vertices.iter()
    }

    /// `(vertex, successor ids)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&Vertex<T>, &[u32])> {
        self.vertices
            .iter()
            .zip(self.successors.iter().map(Vec::as_slice))
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

impl<T: Copy + PartialEq> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Call graph of the functions reachable from one root.
pub type FunctionGraph<'ctx> = Graph<FunctionValue<'ctx>>;

/// Basic-block CFG of a single defined function.
#[derive(Debug)]
pub struct BlockGraph<'ctx> {
    pub function: FunctionValue<'ctx>,
    pub graph: Graph<BasicBlock<'ctx>>,
}
