use crate::core::{ModelError, Result};
use crate::handle::{LiveHandle, MemoryHandle};
use log::{debug, warn};
use std::cell::{Cell, RefCell};

/// A mutation session opened against a parent's live handle.
pub trait MutationSession {
    /// The parent's handle as reachable while the session is open.
    fn handle_mut(&mut self) -> &mut dyn LiveHandle;

    fn commit(&mut self) -> Result<()>;

    /// Releases the session without applying changes. Must not fail.
    fn discard(&mut self);
}

/// A parent entity that can open mutation sessions for its children.
pub trait SessionProvider {
    fn open_session(&self) -> Result<Box<dyn MutationSession + '_>>;
}

/// Holds an open session and discards it on drop unless committed.
pub struct SessionScope<'a> {
    session: Box<dyn MutationSession + 'a>,
    committed: bool,
}

impl<'a> SessionScope<'a> {
    pub fn open(provider: &'a dyn SessionProvider) -> Result<Self> {
        let session = provider.open_session()?;
        debug!("session opened");
        Ok(Self {
            session,
            committed: false,
        })
    }

    pub fn handle_mut(&mut self) -> &mut dyn LiveHandle {
        self.session.handle_mut()
    }

    /// Commits; a failed commit is still released by the drop guard.
    pub fn commit(mut self) -> Result<()> {
        self.session.commit()?;
        self.committed = true;
        debug!("session committed");
        Ok(())
    }
}

impl Drop for SessionScope<'_> {
    fn drop(&mut self) {
        if !self.committed {
            warn!("discarding uncommitted session");
            self.session.discard();
        }
    }
}

/// Runs `op` against the parent's handle inside one session.
///
/// Commits when `op` succeeds and discards when it fails or panics.
pub fn with_open_session<T, F>(provider: &dyn SessionProvider, op: F) -> Result<T>
where
    F: FnOnce(&mut dyn LiveHandle) -> Result<T>,
{
    let mut scope = SessionScope::open(provider)?;
    let value = op(scope.handle_mut())?;
    scope.commit()?;
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Opened,
    Committed,
    Discarded,
}

/// Parent backed by a [`MemoryHandle`].
///
/// Sessions edit a staged copy that replaces the handle only on commit, and
/// every open/commit/discard is recorded.
#[derive(Debug, Default)]
pub struct MemoryParent {
    handle: RefCell<MemoryHandle>,
    events: RefCell<Vec<SessionEvent>>,
    fail_commits: Cell<bool>,
}

impl MemoryParent {
    pub fn new(handle: MemoryHandle) -> Self {
        Self {
            handle: RefCell::new(handle),
            ..Self::default()
        }
    }

    /// Committed state of the handle.
    pub fn snapshot(&self) -> MemoryHandle {
        self.handle.borrow().clone()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.borrow().clone()
    }

    /// Makes subsequent commits fail with `CommandFailed`.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.set(fail);
    }
}

struct MemorySession<'a> {
    parent: &'a MemoryParent,
    staged: MemoryHandle,
}

impl MutationSession for MemorySession<'_> {
    fn handle_mut(&mut self) -> &mut dyn LiveHandle {
        &mut self.staged
    }

    fn commit(&mut self) -> Result<()> {
        if self.parent.fail_commits.get() {
            return Err(ModelError::command_failed("commit", &[], "session is locked"));
        }
        *self.parent.handle.borrow_mut() = self.staged.clone();
        self.parent.events.borrow_mut().push(SessionEvent::Committed);
        Ok(())
    }

    fn discard(&mut self) {
        self.parent.events.borrow_mut().push(SessionEvent::Discarded);
    }
}

impl SessionProvider for MemoryParent {
    fn open_session(&self) -> Result<Box<dyn MutationSession + '_>> {
        self.events.borrow_mut().push(SessionEvent::Opened);
        Ok(Box::new(MemorySession {
            parent: self,
            staged: self.snapshot(),
        }))
    }
}
