//! Session-scoped cache, shared by `Arc` and cleared on logout

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::log::debug;
use crate::occupancy::AreaLayout;

/// Data that lives exactly as long as the user's session
#[derive(Debug, Default)]
pub struct SessionCache {
    balance_checked: AtomicBool,
    layouts: Mutex<HashMap<String, Arc<AreaLayout>>>,
}

impl SessionCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn balance_checked(&self) -> bool {
        self.balance_checked.load(Ordering::Acquire)
    }

    /// Record the balance check; true only for the first caller of the session
    pub fn mark_balance_checked(&self) -> bool {
        !self.balance_checked.swap(true, Ordering::AcqRel)
    }

    pub fn layout(&self, area_id: &str) -> Option<Arc<AreaLayout>> {
        self.layouts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(area_id)
            .cloned()
    }

    pub fn store_layout(&self, area_id: &str, layout: impl Into<Arc<AreaLayout>>) -> Arc<AreaLayout> {
        let layout = layout.into();
        self.layouts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(area_id.to_string(), layout.clone());
        layout
    }

    /// Forget everything; called on logout
    pub fn invalidate(&self) {
        debug!("session cache invalidated");
        self.balance_checked.store(false, Ordering::Release);
        self.layouts.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
