#![forbid(unsafe_code)]

//! One page's worth of reactive state.
//!
//! [`App`] owns the scheduler for a page and wires the other pieces to it:
//! template nodes are compiled and bound in one call, and the hydration
//! backend wakes the scheduler whenever a response arrives so that model
//! writes made by response handlers are flushed by the next checkpoint.

use std::time::Duration;

use wade_runtime::{
    BindingId, BindingTarget, CheckpointReport, Evaluator, ModelObject, Scheduler,
    SchedulerHandle,
};
use wade_template::{RawAttribute, compile_attributes, compile_text};

use crate::config::WadeConfig;
use crate::error::Error;

pub struct App {
    config: WadeConfig,
    scheduler: Scheduler,
}

impl App {
    /// App evaluating expressions as model paths.
    #[must_use]
    pub fn new(config: WadeConfig) -> Self {
        let scheduler = Scheduler::new(config.scheduler.clone());
        Self { config, scheduler }
    }

    /// App with a host expression evaluator.
    pub fn with_evaluator(config: WadeConfig, evaluator: impl Evaluator + 'static) -> Self {
        let scheduler = Scheduler::with_evaluator(config.scheduler.clone(), evaluator);
        Self { config, scheduler }
    }

    #[must_use]
    pub fn config(&self) -> &WadeConfig {
        &self.config
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        self.scheduler.handle()
    }

    /// Compile and bind a text node. Blank text binds nothing.
    pub fn bind_text(
        &mut self,
        text: &str,
        scope: &ModelObject,
        target: impl BindingTarget + 'static,
    ) -> Result<Option<BindingId>, Error> {
        let Some(value) = compile_text(text) else {
            return Ok(None);
        };
        Ok(Some(self.scheduler.bind(value, scope, target)?))
    }

    /// Compile every attribute of an element, then bind each one to the
    /// target `make_target` returns for its name.
    ///
    /// Nothing is bound if any attribute fails to compile.
    pub fn bind_attributes<T>(
        &mut self,
        attrs: &[RawAttribute],
        scope: &ModelObject,
        mut make_target: impl FnMut(&str) -> T,
    ) -> Result<Vec<BindingId>, Error>
    where
        T: BindingTarget + 'static,
    {
        let compiled = compile_attributes(attrs)?;
        let mut ids = Vec::with_capacity(compiled.len());
        for attr in compiled {
            let target = make_target(&attr.name);
            match self.scheduler.bind(attr.value, scope, target) {
                Ok(id) => ids.push(id),
                Err(err) => {
                    for id in ids {
                        self.scheduler.unbind(id);
                    }
                    return Err(err.into());
                }
            }
        }
        Ok(ids)
    }

    /// Apply every pending change now.
    pub fn flush(&mut self) -> CheckpointReport {
        self.scheduler.checkpoint()
    }

    /// Wait for work from listeners or other threads and flush it.
    pub fn wait(&mut self, timeout: Duration) -> Option<CheckpointReport> {
        self.scheduler.wait_for_checkpoint(timeout)
    }

    /// Backend that replays the request snapshot embedded in `page_html`
    /// before using `inner`, waking this app after every response.
    pub fn hydration_backend<B: wade_http::HttpBackend>(
        &self,
        inner: B,
        page_html: &str,
    ) -> Result<wade_http::CachedBackend<B>, Error> {
        let cache = wade_http::RequestCache::from_page(page_html, &self.config.cache)?;
        tracing::info!(records = cache.total_remaining(), "hydrating from page snapshot");
        let handle = self.scheduler.handle();
        Ok(
            wade_http::CachedBackend::new(inner, cache).with_completion_hook(move || {
                handle.wake();
            }),
        )
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as Json, json};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn blank_text_binds_nothing() {
        let mut app = App::new(WadeConfig::default());
        let model = ModelObject::new();
        assert_eq!(app.bind_text("  \n ", &model, |_: &Json| {}).unwrap(), None);
        assert_eq!(app.scheduler().binding_count(), 0);
    }

    #[test]
    fn attributes_bind_atomically() {
        let mut app = App::new(WadeConfig::default());
        let model = ModelObject::new();
        let mut bad = RawAttribute::from_source("x", Some("y"));
        bad.kind = wade_template::AttributeKind::Unknown("weird".into());
        let attrs = [RawAttribute::from_source("title", Some("{{t}}")), bad];

        let result = app.bind_attributes(&attrs, &model, |_| |_: &Json| {});
        assert!(matches!(result, Err(Error::Compile(_))));
        assert_eq!(app.scheduler().binding_count(), 0);
    }

    #[test]
    fn invalid_path_unbinds_earlier_attributes() {
        let mut app = App::new(WadeConfig::default());
        let model = ModelObject::new();
        let attrs = [
            RawAttribute::from_source("title", Some("{{t}}")),
            RawAttribute::from_source("alt", Some("{{a[}}")),
        ];
        let result = app.bind_attributes(&attrs, &model, |_| |_: &Json| {});
        assert!(matches!(result, Err(Error::Watch(_))));
        assert_eq!(app.scheduler().binding_count(), 0);
        assert!(app.scheduler().registry().is_empty());
    }

    #[test]
    fn text_and_attributes_render_on_flush() {
        let mut app = App::new(WadeConfig::default());
        let model = ModelObject::new().with("name", "ann");
        let out: Rc<RefCell<Vec<(String, Json)>>> = Rc::default();

        let sink = Rc::clone(&out);
        app.bind_text("hi {{name}}", &model, move |v: &Json| {
            sink.borrow_mut().push(("#text".into(), v.clone()));
        })
        .unwrap();
        let attrs = [RawAttribute::from_source("data-name", Some("{{name}}"))];
        app.bind_attributes(&attrs, &model, |name| {
            let sink = Rc::clone(&out);
            let name = name.to_string();
            move |v: &Json| sink.borrow_mut().push((name.clone(), v.clone()))
        })
        .unwrap();

        app.flush();
        assert_eq!(
            *out.borrow(),
            vec![
                ("#text".to_string(), json!("hi ann")),
                ("data-name".to_string(), json!("ann")),
            ]
        );
    }
}
