//! Middlewares bound to a run before its body executes.

use super::run_context::RunContext;
use crate::emitter::{EmitterOptions, EventMeta, Payload};
use crate::errors::FrameworkError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Hooks into a run with access to its full context.
///
/// Unlike [`Run::observe`](super::Run::observe), which only sees the emitter,
/// a middleware can read the run id, signal and input of the run it is bound
/// to. Closures taking `&RunContext` are middlewares too.
pub trait RunMiddleware: Send {
    fn bind(&self, ctx: &RunContext) -> Result<(), FrameworkError>;
}

impl<F> RunMiddleware for F
where
    F: Fn(&RunContext) -> Result<(), FrameworkError> + Send,
{
    fn bind(&self, ctx: &RunContext) -> Result<(), FrameworkError> {
        self(ctx)
    }
}

#[derive(Default)]
struct Trajectory {
    depth: HashMap<String, usize>,
    lines: Vec<String>,
}

impl Trajectory {
    fn depth_of(&mut self, meta: &EventMeta) -> usize {
        let Some(trace) = &meta.trace else {
            return 0;
        };
        if let Some(depth) = self.depth.get(&trace.run_id) {
            return *depth;
        }
        let depth = trace
            .parent_run_id
            .as_ref()
            .and_then(|parent| self.depth.get(parent))
            .map_or(0, |parent| parent + 1);
        self.depth.insert(trace.run_id.clone(), depth);
        depth
    }
}

/// Records the `start`/`finish` of a run and of every run nested in it,
/// indented by nesting depth, and logs each line with `info!`.
#[derive(Clone, Default)]
pub struct TrajectoryMiddleware {
    state: Arc<Mutex<Trajectory>>,
}

impl TrajectoryMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines recorded so far, e.g. `"  tool.lookup.start"`.
    pub fn lines(&self) -> Vec<String> {
        self.state.lock().lines.clone()
    }
}

impl RunMiddleware for TrajectoryMiddleware {
    fn bind(&self, ctx: &RunContext) -> Result<(), FrameworkError> {
        {
            let mut state = self.state.lock();
            state.depth.clear();
            state.lines.clear();
            state.depth.insert(ctx.run_id().to_string(), 0);
        }

        let state = self.state.clone();
        ctx.emitter().on_match(
            crate::emitter::Matcher::predicate(|meta: &EventMeta| {
                meta.name == "start" || meta.name == "finish"
            }),
            move |_: Payload, meta: EventMeta| {
                let mut trajectory = state.lock();
                let depth = trajectory.depth_of(&meta);
                let line = format!("{}{}", "  ".repeat(depth), meta.path);
                info!(target: "hivekit::trajectory", "{line}");
                trajectory.lines.push(line);
                async { Ok(()) }
            },
            EmitterOptions::default().match_nested(true),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RunInstance, RunOptions};
    use crate::emitter::{ChildOptions, Emitter};

    struct Owner(Emitter);

    impl RunInstance for Owner {
        fn emitter(&self) -> &Emitter {
            &self.0
        }
    }

    #[tokio::test]
    async fn test_trajectory_indents_nested_runs() {
        let root = Emitter::new_root();
        let outer = Owner(root.child(ChildOptions::namespace(["outer"])).unwrap());
        let inner = Arc::new(Owner(root.child(ChildOptions::namespace(["inner"])).unwrap()));
        let trajectory = TrajectoryMiddleware::new();

        RunContext::enter(&outer, (), RunOptions::default(), move |_| async move {
            RunContext::enter(&*inner, (), RunOptions::default(), |_| async { Ok(()) }).await?;
            Ok(())
        })
        .middleware(trajectory.clone())
        .await
        .unwrap();

        assert_eq!(
            trajectory.lines(),
            vec!["outer.start", "  inner.start", "  inner.finish", "outer.finish"]
        );
    }
}
