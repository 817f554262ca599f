//! Two-phase voting-then-notification broadcast.
//!
//! Used ahead of anything that can be vetoed (EVSE creation, EVSE removal):
//! every registered voter gets a chance to object before the change is
//! committed, and every registered listener is told about it afterward,
//! unconditionally.

use std::sync::Arc;

type Voter<Args> = Arc<dyn Fn(&Args) -> bool + Send + Sync>;
type Notifier<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A broadcaster with two handler kinds: voters that can veto, and
/// notifiers that just observe.
pub struct VotingNotificator<Args: Clone> {
    voters: parking_lot::Mutex<Vec<Voter<Args>>>,
    notifiers: parking_lot::Mutex<Vec<Notifier<Args>>>,
}

impl<Args: Clone> Default for VotingNotificator<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Clone> VotingNotificator<Args> {
    pub fn new() -> Self {
        Self {
            voters: parking_lot::Mutex::new(Vec::new()),
            notifiers: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn add_voting_handler(&self, handler: impl Fn(&Args) -> bool + Send + Sync + 'static) {
        self.voters.lock().push(Arc::new(handler));
    }

    pub fn add_notification_handler(&self, handler: impl Fn(&Args) + Send + Sync + 'static) {
        self.notifiers.lock().push(Arc::new(handler));
    }

    /// Ask every registered voter. Every voter is consulted regardless of
    /// an earlier veto, so every veto reason gets a chance to be logged;
    /// the overall vote is the AND of all of them.
    pub fn send_voting(&self, args: &Args) -> bool {
        let voters = self.voters.lock();
        let mut approved = true;
        for voter in voters.iter() {
            if !voter(args) {
                approved = false;
            }
        }
        approved
    }

    /// Tell every registered notifier. Notifiers are expected infallible;
    /// a panicking notifier is not caught here.
    pub fn send_notification(&self, args: &Args) {
        let notifiers = self.notifiers.lock();
        for notifier in notifiers.iter() {
            notifier(args);
        }
    }
}
