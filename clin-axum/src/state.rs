use std::sync::Arc;

use clin_core::ClinApp;

pub struct ClinAxumState<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    pub app: Arc<ClinApp<R, P>>,
}

impl<R, P> Clone for ClinAxumState<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
        }
    }
}

impl<R, P> ClinAxumState<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    pub fn new(app: ClinApp<R, P>) -> Self {
        Self { app: Arc::new(app) }
    }
}
