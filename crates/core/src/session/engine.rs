use super::{SessionConfig, SessionState};
use crate::error::{Result, WfdError};
use crate::handler::{CSeq, Context, Handler, Progress, Sequence};
use crate::protocol::{Message, Request};
use crate::transport::{TimerId, Transport};

/// Assigns the step id of an inbound request for one role.
pub(crate) type Identify = fn(&mut Request) -> Result<()>;

/// Top-level driver of one side of a WFD session.
///
/// Owns the role's state sequence and everything its handlers share. All
/// entry points run to completion before returning; a multi-threaded host
/// must serialize them (one event loop, or one mutex around the engine).
///
/// Failure policy: any error from the handler tree resets the whole tree
/// and leaves the engine [`Failed`](SessionState::Failed). Nothing is
/// retried; the host decides whether to `start()` again.
pub struct Engine<M: ?Sized> {
    role: &'static str,
    machine: Sequence<M>,
    cseq: CSeq,
    media: Box<M>,
    transport: Box<dyn Transport>,
    config: SessionConfig,
    state: SessionState,
    identify: Identify,
}

impl<M: ?Sized> Engine<M> {
    pub(crate) fn assemble(
        role: &'static str,
        machine: Sequence<M>,
        media: Box<M>,
        transport: Box<dyn Transport>,
        config: SessionConfig,
        identify: Identify,
    ) -> Self {
        Self {
            role,
            machine,
            cseq: CSeq::new(),
            media,
            transport,
            config,
            state: SessionState::Idle,
            identify,
        }
    }

    fn split(&mut self) -> (&mut Sequence<M>, Context<'_, M>) {
        (
            &mut self.machine,
            Context {
                cseq: &mut self.cseq,
                media: &mut *self.media,
                transport: &mut *self.transport,
                config: &self.config,
            },
        )
    }

    /// Start the session. Calling it while running does nothing.
    pub fn start(&mut self) -> Result<()> {
        if self.state == SessionState::Running {
            return Ok(());
        }
        tracing::info!(role = self.role, "session starting");
        self.state = SessionState::Running;
        let (machine, mut ctx) = self.split();
        let result = machine.start(&mut ctx);
        self.settle(result)
    }

    /// Drop all in-flight state. The engine can be started again.
    pub fn reset(&mut self) {
        let (machine, mut ctx) = self.split();
        machine.reset(&mut ctx);
        self.state = SessionState::Idle;
        tracing::debug!(role = self.role, "session reset");
    }

    /// Deliver one message received from the peer.
    ///
    /// A message no armed handler accepts is a protocol violation: the
    /// session is reset and the error returned.
    pub fn handle_message(&mut self, mut message: Message) -> Result<()> {
        if self.state != SessionState::Running {
            return Err(WfdError::NotRunning);
        }
        if let Message::Request(request) = &mut message
            && let Err(e) = (self.identify)(request)
        {
            return self.settle(Err(e));
        }

        tracing::debug!(
            role = self.role,
            state = self.current_state(),
            cseq = message.cseq(),
            message = %message.describe(),
            "message received"
        );
        if !self.machine.can_handle(&message) {
            tracing::warn!(role = self.role, message = %message.describe(), "unexpected message");
            return self.settle(Err(WfdError::UnexpectedMessage(message.describe())));
        }
        let (machine, mut ctx) = self.split();
        let result = machine.handle(&message, &mut ctx);
        self.settle(result)
    }

    /// Parse and deliver one complete message text.
    ///
    /// Malformed text is returned as [`WfdError::Parse`] without touching
    /// the session.
    pub fn handle_data(&mut self, data: &str) -> Result<()> {
        let message = Message::parse(data)?;
        self.handle_message(message)
    }

    /// Notify the engine that a timer created through its transport fired.
    ///
    /// A reply timer the session is waiting on resets the session and
    /// yields [`WfdError::ReplyTimeout`]. Other ids are ignored.
    pub fn on_timer_event(&mut self, id: TimerId) -> Result<()> {
        if self.state != SessionState::Running || !self.machine.handles_timeout(id) {
            tracing::trace!(role = self.role, timer = %id, "ignoring timer");
            return Ok(());
        }
        tracing::warn!(role = self.role, timer = %id, state = self.current_state(), "reply timed out");
        self.settle(Err(WfdError::ReplyTimeout(id)))
    }

    /// Build a request for a local command and send it if the current
    /// state can. The `CSeq` is consumed even when the command is rejected.
    pub(crate) fn send_command(
        &mut self,
        command: &'static str,
        build: impl FnOnce(u32, &M, &SessionConfig) -> Request,
    ) -> Result<()> {
        if self.state != SessionState::Running {
            return Err(WfdError::NotRunning);
        }
        let cseq = self.cseq.next();
        let message = Message::Request(build(cseq, &*self.media, &self.config));
        if !self.machine.can_send(&message) {
            tracing::warn!(role = self.role, command, state = self.current_state(), "command rejected");
            return Err(WfdError::CommandRejected(command));
        }
        tracing::debug!(role = self.role, command, cseq, "sending command");
        let (machine, mut ctx) = self.split();
        let result = machine.send(&message, &mut ctx);
        self.settle(result)
    }

    fn settle(&mut self, result: Result<Progress>) -> Result<()> {
        match result {
            Ok(Progress::Pending) => Ok(()),
            Ok(Progress::Completed) => {
                tracing::info!(role = self.role, "session completed");
                self.state = SessionState::Completed;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(role = self.role, error = %e, "session failed");
                let (machine, mut ctx) = self.split();
                machine.reset(&mut ctx);
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Name of the active protocol state, e.g. `"CapabilityNegotiation"`.
    pub fn current_state(&self) -> Option<&'static str> {
        self.machine.current_name()
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The `CSeq` the next outbound request will carry.
    pub fn next_cseq(&self) -> u32 {
        self.cseq.peek()
    }
}
