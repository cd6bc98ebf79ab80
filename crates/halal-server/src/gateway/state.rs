use halal::context::AppContext;
use halal::detection::LogoDetection;
use halal::ocr::TextExtractor;

/// Axum state shared by every handler.
pub struct HandlerState<D, O> {
    pub ctx: AppContext<D, O>,
}

impl<D, O> Clone for HandlerState<D, O> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
        }
    }
}

impl<D, O> HandlerState<D, O>
where
    D: LogoDetection + 'static,
    O: TextExtractor + 'static,
{
    pub fn new(ctx: AppContext<D, O>) -> Self {
        Self { ctx }
    }

    /// Largest accepted request body, from settings.
    pub fn max_upload_bytes(&self) -> usize {
        self.ctx.settings().max_upload_bytes
    }
}
