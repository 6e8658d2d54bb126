//! Symbol resolution for metrics and capture groups

use crate::ast::CaptureName;
use crate::capture::PatternInfo;
use bytecode_system::MetricDescriptor;
use core_types::ValueType;
use std::collections::HashMap;

/// Declared metrics, in declaration order
#[derive(Debug, Clone, Default)]
pub struct MetricTable {
    descriptors: Vec<MetricDescriptor>,
    by_name: HashMap<String, usize>,
}

impl MetricTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor; returns `None` if the name is taken
    pub fn declare(&mut self, descriptor: MetricDescriptor) -> Option<usize> {
        if self.by_name.contains_key(&descriptor.name) {
            return None;
        }
        let idx = self.descriptors.len();
        self.by_name.insert(descriptor.name.clone(), idx);
        self.descriptors.push(descriptor);
        Some(idx)
    }

    /// Look up a metric by name
    pub fn lookup(&self, name: &str) -> Option<(usize, &MetricDescriptor)> {
        self.by_name
            .get(name)
            .map(|&idx| (idx, &self.descriptors[idx]))
    }

    /// Descriptor at a table index
    pub fn get(&self, idx: usize) -> Option<&MetricDescriptor> {
        self.descriptors.get(idx)
    }

    /// Change the value type of a metric
    pub fn set_value_type(&mut self, idx: usize, value_type: ValueType) {
        if let Some(descriptor) = self.descriptors.get_mut(idx) {
            descriptor.value_type = value_type;
        }
    }

    /// All descriptors in table order
    pub fn descriptors(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }

    /// Consume the table
    pub fn into_descriptors(self) -> Vec<MetricDescriptor> {
        self.descriptors
    }
}

/// A resolved capture group reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureBinding {
    /// Pattern table index
    pub pattern: usize,
    /// 1-based group index
    pub group: usize,
    /// Type of the group's text
    pub value_type: ValueType,
}

/// A lexical block that binds the captures of the patterns in its condition
#[derive(Debug, Clone, Default)]
struct Scope {
    /// Patterns bound in this scope, in match order
    patterns: Vec<usize>,
}

/// Stack of capture scopes, innermost last
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    /// Create a stack holding the program scope
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// Enter a block
    pub fn push(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Leave a block, discarding its bindings
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Make the captures of a pattern visible in the current block
    pub fn bind(&mut self, pattern: usize) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.patterns.push(pattern);
        }
    }

    /// Resolve a reference, innermost binding first
    pub fn resolve(&self, name: &CaptureName, patterns: &[PatternInfo]) -> Option<CaptureBinding> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.patterns.iter().rev())
            .find_map(|&pattern| {
                let info = patterns.get(pattern)?;
                let group = match name {
                    CaptureName::Index(idx) => *idx,
                    CaptureName::Named(n) => *info.names.get(n)?,
                };
                info.group_type(group).map(|value_type| CaptureBinding {
                    pattern,
                    group,
                    value_type,
                })
            })
    }
}
