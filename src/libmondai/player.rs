use crate::db::LocalStore;
use crate::media::{resolve, DisplayResource, MediaCache, MediaError, MediaSlot};
use crate::session::{Advance, QuizSession, SessionError, Verdict};
use log::debug;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Media(#[from] MediaError),
}

/// Couples a [`QuizSession`] with the store its media lives in.
///
/// The store is only consulted to resolve the current question's media, and the
/// previous media resource is released before the next one is fetched.
pub struct QuizPlayer<'s, R: Rng> {
    store: &'s mut LocalStore,
    session: QuizSession<R>,
    // Dropped before `cache`, so the cache directory is empty by the time it goes.
    slot: MediaSlot,
    cache: MediaCache,
}

impl<'s, R: Rng> QuizPlayer<'s, R> {
    pub fn start(
        store: &'s mut LocalStore,
        session: QuizSession<R>,
        cache: MediaCache,
    ) -> Result<QuizPlayer<'s, R>, PlayerError> {
        let mut player = QuizPlayer {
            store,
            session,
            slot: MediaSlot::default(),
            cache,
        };
        player.show_current()?;
        Ok(player)
    }

    fn show_current(&mut self) -> Result<(), PlayerError> {
        self.slot.release();
        if let Some(current) = self.session.current() {
            let resource = resolve(self.store, current.media, &mut self.cache)?;
            debug!("[Player] Media for question {}: {}", current.position + 1, resource);
            self.slot.replace(resource);
        }
        Ok(())
    }

    pub fn session(&self) -> &QuizSession<R> {
        &self.session
    }

    /// The resource for the current question's media, if one is being shown.
    pub fn media(&self) -> Option<&DisplayResource> {
        self.slot.current()
    }

    pub fn submit_answer(&mut self, answer_id: &str) -> Result<Verdict, PlayerError> {
        Ok(self.session.submit_answer(answer_id)?)
    }

    pub fn advance(&mut self) -> Result<Advance, PlayerError> {
        let step = self.session.advance()?;
        match step {
            Advance::Next(_) => self.show_current()?,
            Advance::Finished(_) => self.slot.release(),
        }
        Ok(step)
    }

    pub fn into_session(self) -> QuizSession<R> {
        self.session
    }
}
