//! Read side of the session: the rows and counters the views render.
//!
//! Everything here is recomputed from the current store snapshot, so the
//! dashboard, class table and student table always agree after a mutation.

use crate::config::Config;
use crate::model::{Class, EntityKind, Student};
use crate::remote::Remote;
use crate::resolve::resolve;
use crate::search;
use crate::stats::{self, DashboardStats};
use crate::sync::{Coordinator, SubscriptionId, SyncError, SyncOptions};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRow {
    #[serde(flatten)]
    pub class: Class,
    /// `student_count`, or the configured fallback when the remote omitted it.
    pub student_count_display: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    #[serde(flatten)]
    pub student: Student,
    pub class_name: String,
    pub class_found: bool,
}

/// Confirmed mutations seen per collection since the dashboard was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub classes: u64,
    pub students: u64,
}

#[derive(Default)]
struct Revisions {
    classes: AtomicU64,
    students: AtomicU64,
}

pub struct Dashboard {
    coordinator: Arc<Coordinator>,
    fallback: u32,
    revisions: Arc<Revisions>,
    subscription: SubscriptionId,
}

impl Dashboard {
    pub fn new(coordinator: Arc<Coordinator>, fallback: u32) -> Self {
        let revisions = Arc::new(Revisions::default());
        let counter = Arc::clone(&revisions);
        let subscription = coordinator.subscribe(move |event| {
            let slot = match event.kind() {
                EntityKind::Class => &counter.classes,
                EntityKind::Student => &counter.students,
            };
            slot.fetch_add(1, Ordering::SeqCst);
        });
        Self {
            coordinator,
            fallback,
            revisions,
            subscription,
        }
    }

    /// Builds a coordinator over `remote` and performs the initial load.
    pub fn connect(remote: Arc<dyn Remote>, config: &Config) -> Result<Self, SyncError> {
        let coordinator = Arc::new(Coordinator::new(remote, SyncOptions::from_config(config)));
        coordinator.load()?;
        Ok(Self::new(coordinator, config.display.student_count_fallback))
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn refresh(&self) -> Result<DashboardStats, SyncError> {
        self.coordinator.load()?;
        Ok(self.stats())
    }

    pub fn stats(&self) -> DashboardStats {
        let snap = self.coordinator.snapshot();
        stats::compute(&snap.classes, &snap.students, self.fallback)
    }

    pub fn class_rows(&self, query: &str) -> Vec<ClassRow> {
        let snap = self.coordinator.snapshot();
        search::filter(snap.classes.as_slice(), query)
            .into_iter()
            .map(|class| ClassRow {
                student_count_display: stats::student_count_or(&class, self.fallback),
                class,
            })
            .collect()
    }

    pub fn student_rows(&self, query: &str) -> Vec<StudentRow> {
        let snap = self.coordinator.snapshot();
        search::filter(snap.students.as_slice(), query)
            .into_iter()
            .map(|student| {
                let resolved = resolve(student.class_id, &snap.classes);
                StudentRow {
                    class_name: resolved.display_name().to_string(),
                    class_found: resolved.is_found(),
                    student,
                }
            })
            .collect()
    }

    pub fn revision(&self) -> Revision {
        Revision {
            classes: self.revisions.classes.load(Ordering::SeqCst),
            students: self.revisions.students.load(Ordering::SeqCst),
        }
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.coordinator.unsubscribe(self.subscription);
    }
}
