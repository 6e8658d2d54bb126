//! Virtual machine for one compiled program
//!
//! A VM is built once per program and then shared by every thread that
//! feeds it lines. It holds no per-line state; each call to
//! [`VM::execute`] gets a fresh [`ExecutionContext`].

use crate::context::ExecutionContext;
use crate::dispatch::Dispatcher;
use crate::line::LogLine;
use bytecode_system::Program;
use core_types::RuntimeError;
use metric_store::{Metric, MetricStore, StoreError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Virtual machine executing one program against a metric store
#[derive(Debug)]
pub struct VM {
    program: Arc<Program>,
    dispatcher: Dispatcher,
    store: Arc<MetricStore>,
}

impl VM {
    /// Create a VM, registering the program's metrics with `store`
    ///
    /// Fails if a metric of the same name but a different shape is
    /// already registered.
    ///
    /// # Example
    ///
    /// ```
    /// use interpreter::{LogLine, VM};
    /// use metric_store::MetricStore;
    /// use std::sync::Arc;
    ///
    /// let program = parser::compile("lines", "counter lines\n/$/ { lines++ }\n").unwrap();
    /// let store = Arc::new(MetricStore::new());
    /// let vm = VM::new(Arc::new(program), &store).unwrap();
    ///
    /// vm.execute(&LogLine::new("app.log", "hello")).unwrap();
    /// let snapshot = store.snapshot();
    /// assert_eq!(snapshot.metric("lines").unwrap().data[0].value, core_types::Value::Int(1));
    /// ```
    pub fn new(program: Arc<Program>, store: &Arc<MetricStore>) -> Result<Self, StoreError> {
        let metrics = program
            .metrics
            .iter()
            .map(|descriptor| store.register(descriptor))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            program = %program.name,
            metrics = metrics.len(),
            instructions = program.instruction_count(),
            "vm ready"
        );
        Ok(Self {
            program,
            dispatcher: Dispatcher::new(metrics),
            store: Arc::clone(store),
        })
    }

    /// The loaded program
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Program name
    pub fn name(&self) -> &str {
        &self.program.name
    }

    /// Store metrics in program table order
    pub fn metrics(&self) -> &[Arc<Metric>] {
        self.dispatcher.metrics()
    }

    /// Run the program over one line
    ///
    /// A runtime error abandons the rest of the line. Mutations made
    /// before the error stay in the store.
    pub fn execute(&self, line: &LogLine) -> Result<(), RuntimeError> {
        let mut ctx = ExecutionContext::new(&self.program, line, self.store.now());
        let result = self.dispatcher.execute(&mut ctx);
        if let Err(e) = &result {
            let pc = ctx.instruction_pointer.saturating_sub(1);
            warn!(
                program = %self.program.name,
                file = %line.filename,
                pc,
                error = %e,
                "line aborted"
            );
        }
        result
    }
}
