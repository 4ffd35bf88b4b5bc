use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::info;

use super::capability::{ErrorListener, Processor};
use crate::error::{Error, Result};
use crate::utils::paths;

/// Compiled programs keyed by normalized template path.
///
/// Lookups share a read lock. A miss compiles without holding any lock, so
/// two requests may compile the same path concurrently; the first one to
/// store wins and both get an equivalent program.
pub struct TemplateCache<P: Processor> {
    programs: RwLock<HashMap<PathBuf, Arc<P::Program>>>,
}

impl<P: Processor> Default for TemplateCache<P> {
    fn default() -> Self {
        Self {
            programs: RwLock::new(HashMap::new()),
        }
    }
}

impl<P: Processor> TemplateCache<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached program for `path`, compiling it on a miss.
    /// With `store == false` the program is compiled fresh and not kept.
    pub fn get_or_compile(
        &self,
        processor: &P,
        path: &Path,
        store: bool,
        listener: &mut dyn ErrorListener,
    ) -> Result<Arc<P::Program>> {
        let key = paths::normalize(path);

        if store {
            let programs = self.programs.read().map_err(|_| poisoned())?;
            if let Some(program) = programs.get(&key) {
                return Ok(Arc::clone(program));
            }
        }

        info!("Compiling and caching stylesheet \"{}\" ...", key.display());
        let program = Arc::new(processor.compile(&key, listener)?);

        if !store {
            return Ok(program);
        }

        let mut programs = self.programs.write().map_err(|_| poisoned())?;
        Ok(Arc::clone(programs.entry(key).or_insert(program)))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.programs
            .read()
            .map(|programs| programs.contains_key(&paths::normalize(path)))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.programs.read().map(|programs| programs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached program, e.g. after templates changed on disk.
    pub fn clear(&self) -> Result<()> {
        self.programs.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}

fn poisoned() -> Error {
    Error::internal_unexpected("template cache lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::capability::{CompiledProgram, ResultSink, Source, Validation};
    use crate::engine::diagnostics::TransformationErrorListener;
    use crate::engine::output::OutputProperties;
    use crate::engine::params::ParameterSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Program(PathBuf);

    impl CompiledProgram for Program {
        fn output_properties(&self) -> OutputProperties {
            OutputProperties::new()
        }
    }

    #[derive(Default)]
    struct CountingProcessor {
        compiled: AtomicUsize,
    }

    impl Processor for CountingProcessor {
        type Program = Program;

        fn compile(&self, path: &Path, _listener: &mut dyn ErrorListener) -> Result<Program> {
            self.compiled.fetch_add(1, Ordering::SeqCst);
            Ok(Program(path.to_path_buf()))
        }

        fn transform(
            &self,
            _program: &Program,
            _source: &Source,
            _parameters: &ParameterSet,
            _destination: &mut dyn ResultSink,
            _listener: &mut dyn ErrorListener,
        ) -> Result<()> {
            Ok(())
        }

        fn validate(&self, _schemas: &[String], source: &Source, _label: &str) -> Result<Validation> {
            Ok(Validation {
                output: source.to_text()?,
                report: None,
            })
        }
    }

    #[test]
    fn equivalent_paths_share_one_entry() {
        let cache = TemplateCache::<CountingProcessor>::new();
        let processor = CountingProcessor::default();
        let mut listener = TransformationErrorListener::new(false);

        let first = cache
            .get_or_compile(&processor, Path::new("/app/xsl/./a.xsl"), true, &mut listener)
            .unwrap();
        let second = cache
            .get_or_compile(&processor, Path::new("/app/xsl/sub/../a.xsl"), true, &mut listener)
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.0, PathBuf::from("/app/xsl/a.xsl"));
        assert_eq!(processor.compiled.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unstored_compilation_leaves_cache_empty() {
        let cache = TemplateCache::<CountingProcessor>::new();
        let processor = CountingProcessor::default();
        let mut listener = TransformationErrorListener::new(true);

        cache
            .get_or_compile(&processor, Path::new("/app/xsl/a.xsl"), false, &mut listener)
            .unwrap();
        cache
            .get_or_compile(&processor, Path::new("/app/xsl/a.xsl"), false, &mut listener)
            .unwrap();

        assert!(cache.is_empty());
        assert_eq!(processor.compiled.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clear_forgets_programs() {
        let cache = TemplateCache::<CountingProcessor>::new();
        let processor = CountingProcessor::default();
        let mut listener = TransformationErrorListener::new(false);
        cache
            .get_or_compile(&processor, Path::new("/a.xsl"), true, &mut listener)
            .unwrap();

        cache.clear().unwrap();

        assert!(!cache.contains(Path::new("/a.xsl")));
    }
}
