//! Tracer: nested spans over an OpenTelemetry tracer provider.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use opentelemetry::trace::{FutureExt as _, SpanKind, TraceContextExt as _, Tracer as _, TracerProvider as _};
use opentelemetry::Context;
use opentelemetry_sdk::trace::{BatchConfig, BatchSpanProcessor, SdkTracer, SdkTracerProvider, SpanExporter, TracerProviderBuilder};
use opentelemetry_sdk::Resource;

use super::span::SpanHandle;

/// Handle of the span active on the current task, or a no-op handle.
pub fn current_span() -> SpanHandle {
    SpanHandle::from_context(Context::current())
}

/// Tracer settings.
#[derive(Debug, Clone)]
pub struct TracerConfig {
    /// Instrumentation scope and `service.name`.
    pub name: String,
    /// Whether spans are created at all.
    pub instrumented: bool,
    /// Whether message text and tool payloads are copied onto spans.
    pub record_content: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            instrumented: true,
            record_content: false,
        }
    }
}

struct TracerInner {
    name: String,
    provider: SdkTracerProvider,
    tracer: SdkTracer,
    instrumented: AtomicBool,
    record_content: AtomicBool,
}

/// Creates spans through an [`SdkTracerProvider`] and tracks the
/// instrumentation switch.
///
/// Cloning is cheap; clones share the provider and both switches.
#[derive(Clone)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("name", &self.inner.name)
            .field("instrumented", &self.is_instrumented())
            .field("record_content", &self.record_content())
            .finish()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Tracer {
    pub fn builder() -> TracerBuilder {
        TracerBuilder {
            config: TracerConfig::default(),
            provider: SdkTracerProvider::builder(),
        }
    }

    /// A tracer that never creates spans.
    pub fn disabled() -> Self {
        let tracer = Self::builder().build();
        tracer.uninstrument();
        tracer
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Turn instrumentation on.
    pub fn instrument(&self) {
        self.inner.instrumented.store(true, Ordering::SeqCst);
    }

    /// Turn instrumentation off. Wrapped calls then run without spans.
    pub fn uninstrument(&self) {
        self.inner.instrumented.store(false, Ordering::SeqCst);
    }

    pub fn is_instrumented(&self) -> bool {
        self.inner.instrumented.load(Ordering::SeqCst)
    }

    pub fn record_content(&self) -> bool {
        self.inner.record_content.load(Ordering::SeqCst)
    }

    pub fn set_record_content(&self, enabled: bool) {
        self.inner.record_content.store(enabled, Ordering::SeqCst);
    }

    /// Open an internal span under the current context without activating it.
    ///
    /// The span ends when the guard is dropped. Use [`SpanGuard::enter`] to
    /// make it the active span for a future.
    pub fn start_span(&self, name: impl Into<Cow<'static, str>>) -> SpanGuard {
        self.start_span_with_kind(name, SpanKind::Internal)
    }

    pub fn start_span_with_kind(
        &self,
        name: impl Into<Cow<'static, str>>,
        kind: SpanKind,
    ) -> SpanGuard {
        if !self.is_instrumented() {
            return SpanGuard {
                span: SpanHandle::noop(),
            };
        }
        let parent = Context::current();
        let span = self
            .inner
            .tracer
            .span_builder(name)
            .with_kind(kind)
            .start_with_context(&self.inner.tracer, &parent);
        SpanGuard {
            span: SpanHandle::from_context(parent.with_span(span)),
        }
    }

    /// Run `f` inside a new span that is the current span for the whole
    /// future.
    ///
    /// The span ends exactly once, when the future completes or is dropped.
    pub async fn in_span<F, Fut, T>(&self, name: impl Into<Cow<'static, str>>, f: F) -> T
    where
        F: FnOnce(SpanHandle) -> Fut,
        Fut: Future<Output = T>,
    {
        self.in_span_with_kind(name, SpanKind::Internal, f).await
    }

    pub async fn in_span_with_kind<F, Fut, T>(
        &self,
        name: impl Into<Cow<'static, str>>,
        kind: SpanKind,
        f: F,
    ) -> T
    where
        F: FnOnce(SpanHandle) -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.is_instrumented() {
            return f(SpanHandle::noop()).await;
        }
        let guard = self.start_span_with_kind(name, kind);
        let output = guard.enter(f(guard.handle())).await;
        drop(guard);
        output
    }

    /// Like [`Tracer::in_span`], recording an `Err` on the span's status.
    pub async fn in_span_result<F, Fut, T, E>(
        &self,
        name: impl Into<Cow<'static, str>>,
        f: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce(SpanHandle) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        self.in_span_result_with_kind(name, SpanKind::Internal, f)
            .await
    }

    pub async fn in_span_result_with_kind<F, Fut, T, E>(
        &self,
        name: impl Into<Cow<'static, str>>,
        kind: SpanKind,
        f: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce(SpanHandle) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        self.in_span_with_kind(name, kind, |span| async move {
            let result = f(span.clone()).await;
            if let Err(err) = &result {
                span.record_error(err);
            }
            result
        })
        .await
    }

    /// Wrap a one-argument async function so every call runs in a span.
    pub fn instrument_fn<A, F, Fut, T>(
        &self,
        name: impl Into<Cow<'static, str>>,
        f: F,
    ) -> impl Fn(A) -> BoxFuture<'static, T> + Clone + Send + Sync + 'static
    where
        A: Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let tracer = self.clone();
        let name: Cow<'static, str> = name.into();
        let f = Arc::new(f);
        move |args: A| {
            let tracer = tracer.clone();
            let name = name.clone();
            let f = Arc::clone(&f);
            Box::pin(async move { tracer.in_span(name, move |_span| f(args)).await })
        }
    }

    /// Export every span the provider's processors are holding.
    pub async fn force_flush(&self) {
        let provider = self.inner.provider.clone();
        match tokio::task::spawn_blocking(move || provider.force_flush()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, "span flush failed"),
            Err(err) => tracing::warn!(error = %err, "span flush task failed"),
        }
    }

    /// Flush and stop every processor. Spans ended afterwards are dropped.
    pub async fn shutdown(&self) {
        let provider = self.inner.provider.clone();
        match tokio::task::spawn_blocking(move || provider.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::debug!(error = %err, "tracer provider shutdown"),
            Err(err) => tracing::warn!(error = %err, "tracer shutdown task failed"),
        }
    }
}

/// Builder for [`Tracer`].
pub struct TracerBuilder {
    config: TracerConfig,
    provider: TracerProviderBuilder,
}

impl TracerBuilder {
    pub fn with_config(mut self, config: TracerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn with_record_content(mut self, enabled: bool) -> Self {
        self.config.record_content = enabled;
        self
    }

    /// Export each span synchronously as soon as it ends.
    pub fn with_simple_exporter(mut self, exporter: impl SpanExporter + 'static) -> Self {
        self.provider = self.provider.with_simple_exporter(exporter);
        self
    }

    /// Queue spans and export them in batches from a background thread.
    ///
    /// A full queue drops spans instead of blocking the caller.
    pub fn with_batch_exporter(
        mut self,
        exporter: impl SpanExporter + 'static,
        config: BatchConfig,
    ) -> Self {
        let processor = BatchSpanProcessor::builder(exporter)
            .with_batch_config(config)
            .build();
        self.provider = self.provider.with_span_processor(processor);
        self
    }

    pub fn build(self) -> Tracer {
        let name = self.config.name;
        let provider = self
            .provider
            .with_resource(Resource::builder().with_service_name(name.clone()).build())
            .build();
        let tracer = provider.tracer(name.clone());
        Tracer {
            inner: Arc::new(TracerInner {
                name,
                provider,
                tracer,
                instrumented: AtomicBool::new(self.config.instrumented),
                record_content: AtomicBool::new(self.config.record_content),
            }),
        }
    }
}

/// Owns an open span; ends it on drop.
pub struct SpanGuard {
    span: SpanHandle,
}

impl SpanGuard {
    pub fn handle(&self) -> SpanHandle {
        self.span.clone()
    }

    /// Run `fut` with this span as the current span.
    pub async fn enter<Fut: Future>(&self, fut: Fut) -> Fut::Output {
        fut.with_context(self.span.context()).await
    }

    /// End the span now.
    pub fn end(self) {
        drop(self);
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.span.end();
    }
}
