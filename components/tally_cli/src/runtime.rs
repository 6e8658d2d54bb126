//! Runtime orchestration
//!
//! The Runtime owns the shared [`MetricStore`] and one [`VM`] per loaded
//! program. Each input is read on its own thread and every line is run
//! through every program.

use crate::cli::ExportFormat;
use crate::error::{CliError, CliResult};
use interpreter::{LogLine, VM};
use metric_store::{ExpiryWorker, MetricStore};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Line counts for one input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputStats {
    /// Lines read
    pub lines: u64,
    /// Program executions that ended in a runtime error
    pub errors: u64,
}

impl std::ops::AddAssign for InputStats {
    fn add_assign(&mut self, other: Self) {
        self.lines += other.lines;
        self.errors += other.errors;
    }
}

/// Loads programs and feeds inputs through them
#[derive(Debug)]
pub struct Runtime {
    store: Arc<MetricStore>,
    vms: Vec<Arc<VM>>,
    dump_bytecode: bool,
    dump_ast: bool,
}

impl Runtime {
    /// Create a runtime over `store`
    ///
    /// # Example
    /// ```
    /// use metric_store::MetricStore;
    /// use std::sync::Arc;
    /// use tally_cli::Runtime;
    ///
    /// let mut runtime = Runtime::new(Arc::new(MetricStore::new()));
    /// runtime.load_source("lines", "counter lines\n/$/ { lines++ }\n").unwrap();
    /// runtime.process_reader("stdin", "a\nb\n".as_bytes()).unwrap();
    /// assert_eq!(runtime.export(tally_cli::ExportFormat::Text).unwrap(), "lines 2\n");
    /// ```
    pub fn new(store: Arc<MetricStore>) -> Self {
        Self {
            store,
            vms: Vec::new(),
            dump_bytecode: false,
            dump_ast: false,
        }
    }

    /// Enable bytecode printing
    pub fn with_dump_bytecode(mut self, enabled: bool) -> Self {
        self.dump_bytecode = enabled;
        self
    }

    /// Enable syntax tree printing
    pub fn with_dump_ast(mut self, enabled: bool) -> Self {
        self.dump_ast = enabled;
        self
    }

    /// The shared store
    pub fn store(&self) -> &Arc<MetricStore> {
        &self.store
    }

    /// Loaded programs
    pub fn vms(&self) -> &[Arc<VM>] {
        &self.vms
    }

    /// Load a program file; the program is named after the file stem
    pub fn load_file(&mut self, path: &Path) -> CliResult<()> {
        let source = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.load_source(&name, &source)
    }

    /// Compile `source` and register its metrics
    pub fn load_source(&mut self, name: &str, source: &str) -> CliResult<()> {
        let compile_error = |source| CliError::Compile {
            program: name.to_string(),
            source,
        };

        if self.dump_ast {
            let ast = parser::parse(name, source).map_err(compile_error)?;
            println!("{:#?}", ast);
        }

        let program = parser::compile(name, source).map_err(compile_error)?;
        if self.dump_bytecode {
            print!("{}", program);
        }

        let vm = VM::new(Arc::new(program), &self.store).map_err(|source| CliError::Load {
            program: name.to_string(),
            source,
        })?;
        debug!(program = %name, "loaded program");
        self.vms.push(Arc::new(vm));
        Ok(())
    }

    /// Run every line of `reader` through every program
    ///
    /// Runtime errors are counted and logged by the VM; they do not stop
    /// the input.
    pub fn process_reader(&self, filename: &str, reader: impl BufRead) -> CliResult<InputStats> {
        let mut stats = InputStats::default();
        for text in reader.lines() {
            let text = text.map_err(|source| CliError::Io {
                path: PathBuf::from(filename),
                source,
            })?;
            let line = LogLine::new(filename, text);
            stats.lines += 1;
            for vm in &self.vms {
                if vm.execute(&line).is_err() {
                    stats.errors += 1;
                }
            }
        }
        Ok(stats)
    }

    /// Process one file
    pub fn process_file(&self, path: &Path) -> CliResult<InputStats> {
        let file = File::open(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let stats = self.process_reader(&path.display().to_string(), BufReader::new(file))?;
        info!(input = %path.display(), lines = stats.lines, errors = stats.errors, "input done");
        Ok(stats)
    }

    /// Process files concurrently, one thread per file
    ///
    /// Every file is read to the end even when another fails; the first
    /// failure is returned.
    pub fn process_files(&self, paths: &[PathBuf]) -> CliResult<InputStats> {
        let results: Vec<CliResult<InputStats>> = thread::scope(|s| {
            let handles: Vec<_> = paths
                .iter()
                .map(|path| s.spawn(move || self.process_file(path)))
                .collect();
            handles
                .into_iter()
                .zip(paths)
                .map(|(handle, path)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(CliError::Io {
                            path: path.clone(),
                            source: std::io::Error::other("input thread panicked"),
                        })
                    })
                })
                .collect()
        });

        let mut total = InputStats::default();
        for result in results {
            total += result?;
        }
        Ok(total)
    }

    /// Start sweeping expired datums every `interval`
    pub fn start_expiry(&self, interval: Duration) -> CliResult<ExpiryWorker> {
        ExpiryWorker::start(Arc::clone(&self.store), interval).map_err(CliError::Worker)
    }

    /// Render the store in `format`
    pub fn export(&self, format: ExportFormat) -> CliResult<String> {
        let snapshot = self.store.snapshot();
        match format {
            ExportFormat::Text => Ok(snapshot.to_string()),
            ExportFormat::Json => Ok(snapshot.to_json()?),
        }
    }
}
