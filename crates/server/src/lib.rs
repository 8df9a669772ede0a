use std::sync::Arc;

use db::DBService;
use services::services::{
    comments::CommentService,
    events::{ChangeNotifier, EventService},
    tasks::TaskService,
    time_entries::TimeEntryService,
};

pub mod error;
pub mod middleware;
pub mod routes;

/// Shared handler state: the database plus the services wired to the
/// process-wide event bus.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    events: EventService,
    tasks: TaskService,
    comments: CommentService,
    time_entries: TimeEntryService,
}

impl AppState {
    pub fn new(db: DBService) -> Self {
        let events = EventService::new();
        let notifier: Arc<dyn ChangeNotifier> = Arc::new(events.clone());
        Self {
            tasks: TaskService::new(db.clone(), notifier.clone()),
            comments: CommentService::new(db.clone(), notifier.clone()),
            time_entries: TimeEntryService::new(db.clone(), notifier),
            db,
            events,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn events(&self) -> &EventService {
        &self.events
    }

    pub fn tasks(&self) -> &TaskService {
        &self.tasks
    }

    pub fn comments(&self) -> &CommentService {
        &self.comments
    }

    pub fn time_entries(&self) -> &TimeEntryService {
        &self.time_entries
    }
}
