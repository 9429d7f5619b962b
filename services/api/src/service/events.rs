//! Activity feed workflows

use tracing::info;

use super::{ServiceError, ServiceResult, StashService, require_id, required};
use crate::{
    diff::diff,
    models::{Entity, Event, EventPayload, User},
};

const DEFAULT_EVENT_TITLE: &str = "New Event";

impl StashService {
    /// Post an event to a stash's feed, attributed to the current member
    pub async fn create_event(&self, current: &User, payload: EventPayload) -> ServiceResult<Event> {
        let stash_id = required(payload.stash_id.as_deref(), "Stash ID is required.")?;
        let stash = self.load(&self.repos.stashes, &stash_id).await?;
        let actor = self.current_member(current, stash.id()).await?;

        let event = Event::new(
            stash.id(),
            actor.id(),
            payload.kind.unwrap_or_default(),
            payload
                .title
                .clone()
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT_TITLE.to_string()),
            payload.message.clone().unwrap_or_default(),
        );
        Ok(self.repos.events.add(event).await?)
    }

    pub async fn get_event(&self, current: &User, event_id: &str) -> ServiceResult<Event> {
        let event = self.load(&self.repos.events, event_id).await?;
        self.current_member(current, &event.stash_id).await?;
        Ok(event)
    }

    /// Events are not audited themselves
    pub async fn update_event(&self, current: &User, payload: EventPayload) -> ServiceResult<Event> {
        require_id(&payload.id, "Event")?;
        let event = self.load(&self.repos.events, &payload.id).await?;
        self.current_member(current, &event.stash_id).await?;
        if payload.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ServiceError::invalid("Event title cannot be empty."));
        }

        let updated = payload.apply(&event);
        let changes = diff(&event, &updated)?;
        if changes.is_empty() {
            return Ok(event);
        }
        self.commit_update(&self.repos.events, &event, updated, &changes, None)
            .await
    }

    pub async fn delete_event(&self, current: &User, event_id: &str) -> ServiceResult<()> {
        let event = self.load(&self.repos.events, event_id).await?;
        self.current_admin(current, &event.stash_id, "delete events")
            .await?;

        let mut batch = self.repos.new_batch();
        self.repos.purge_event(&mut batch, event_id)?;
        self.repos.commit(batch).await?;
        info!("Event {} deleted from stash {}", event_id, event.stash_id);
        Ok(())
    }
}
