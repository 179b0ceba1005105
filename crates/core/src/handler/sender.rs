//! Sender leaves.
//!
//! A sender keeps a FIFO of the requests it has on the wire. A reply is
//! accepted only when its `CSeq` equals the oldest outstanding request;
//! anything else is left for other handlers (and ends up as an error at
//! the top of the tree).
//!
//! - [`SequencedSender`] builds and sends exactly one request on `start`.
//! - [`OptionalSender`] forwards requests the engine builds from local
//!   commands, selected by a [`Discriminator`].

use std::collections::VecDeque;

use super::{Context, Discriminator, Handler, MessageFactory, Progress, ReplyValidator};
use crate::error::Result;
use crate::protocol::{Message, Reply, Request};
use crate::transport::{TimerId, Transport};

#[derive(Debug)]
struct Outstanding {
    cseq: u32,
    timer: Option<TimerId>,
}

/// Outstanding-request bookkeeping shared by both sender kinds.
#[derive(Debug, Default)]
struct SenderCore {
    queue: VecDeque<Outstanding>,
}

impl SenderCore {
    fn transmit<M: ?Sized>(&mut self, step: &'static str, request: &Request, ctx: &mut Context<'_, M>) {
        ctx.transport.send_rtsp_data(&request.to_string());
        let timer = ctx.transport.create_timer(ctx.config.reply_timeout);
        tracing::debug!(
            step,
            method = %request.method(),
            cseq = request.cseq(),
            "request sent"
        );
        self.queue.push_back(Outstanding {
            cseq: request.cseq(),
            timer,
        });
    }

    fn awaits(&self, message: &Message) -> bool {
        match (message.as_reply(), self.queue.front()) {
            (Some(reply), Some(front)) => reply.cseq() == front.cseq,
            _ => false,
        }
    }

    /// Pop the oldest outstanding request and release its timer.
    fn correlate(&mut self, transport: &mut dyn Transport) {
        if let Some(Outstanding {
            timer: Some(timer), ..
        }) = self.queue.pop_front()
        {
            transport.release_timer(timer);
        }
    }

    fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    fn clear(&mut self, transport: &mut dyn Transport) {
        for timer in self.queue.drain(..).filter_map(|o| o.timer) {
            transport.release_timer(timer);
        }
    }

    fn handles_timeout(&self, id: TimerId) -> bool {
        self.queue.iter().any(|o| o.timer == Some(id))
    }

    fn handle_reply<M: ?Sized, V: ReplyValidator<M>>(
        &mut self,
        validator: &mut V,
        message: &Message,
        ctx: &mut Context<'_, M>,
    ) -> Result<Progress> {
        assert!(
            self.awaits(message),
            "{}: handle() without can_handle() for {}",
            validator.name(),
            message.describe()
        );
        let Some(reply) = message.as_reply() else {
            unreachable!("awaits accepts replies only");
        };
        self.correlate(ctx.transport);
        tracing::debug!(
            step = validator.name(),
            cseq = reply.cseq(),
            code = reply.response_code(),
            "reply received"
        );

        validate(validator, reply, ctx)?;
        if self.is_idle() {
            Ok(Progress::Completed)
        } else {
            Ok(Progress::Pending)
        }
    }
}

fn validate<M: ?Sized, V: ReplyValidator<M>>(
    validator: &mut V,
    reply: &Reply,
    ctx: &mut Context<'_, M>,
) -> Result<()> {
    validator.validate_reply(reply, ctx).inspect_err(|e| {
        tracing::warn!(step = validator.name(), cseq = reply.cseq(), error = %e, "reply rejected");
    })
}

/// Sender that creates its single request when started and can only send
/// that one instance.
pub struct SequencedSender<F> {
    factory: F,
    core: SenderCore,
    /// `CSeq` of the request built by the last `start`.
    instance: Option<u32>,
}

impl<F> SequencedSender<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            core: SenderCore::default(),
            instance: None,
        }
    }
}

impl<M: ?Sized, F: MessageFactory<M>> Handler<M> for SequencedSender<F> {
    fn name(&self) -> &'static str {
        self.factory.name()
    }

    fn start(&mut self, ctx: &mut Context<'_, M>) -> Result<Progress> {
        let request = self.factory.create_message(ctx);
        self.instance = Some(request.cseq());
        self.core.transmit(self.factory.name(), &request, ctx);
        Ok(Progress::Pending)
    }

    fn reset(&mut self, ctx: &mut Context<'_, M>) {
        self.core.clear(ctx.transport);
        self.instance = None;
    }

    fn can_send(&self, message: &Message) -> bool {
        message
            .as_request()
            .is_some_and(|request| self.instance == Some(request.cseq()))
    }

    fn send(&mut self, message: &Message, ctx: &mut Context<'_, M>) -> Result<Progress> {
        assert!(
            self.can_send(message),
            "{}: send() without can_send() for {}",
            self.factory.name(),
            message.describe()
        );
        if let Some(request) = message.as_request() {
            self.core.transmit(self.factory.name(), request, ctx);
        }
        Ok(Progress::Pending)
    }

    fn can_handle(&self, message: &Message) -> bool {
        self.core.awaits(message)
    }

    fn handle(&mut self, message: &Message, ctx: &mut Context<'_, M>) -> Result<Progress> {
        self.core.handle_reply(&mut self.factory, message, ctx)
    }

    fn handles_timeout(&self, id: TimerId) -> bool {
        self.core.handles_timeout(id)
    }
}

/// Sender for requests built outside the tree, typically by an engine
/// command. Accepts any request matching its [`Discriminator`] and
/// completes once every sent request has been answered.
pub struct OptionalSender<V> {
    discriminator: Discriminator,
    validator: V,
    core: SenderCore,
}

impl<V> OptionalSender<V> {
    pub fn new(discriminator: Discriminator, validator: V) -> Self {
        Self {
            discriminator,
            validator,
            core: SenderCore::default(),
        }
    }
}

impl<M: ?Sized, V: ReplyValidator<M>> Handler<M> for OptionalSender<V> {
    fn name(&self) -> &'static str {
        self.validator.name()
    }

    fn start(&mut self, _ctx: &mut Context<'_, M>) -> Result<Progress> {
        Ok(Progress::Pending)
    }

    fn reset(&mut self, ctx: &mut Context<'_, M>) {
        self.core.clear(ctx.transport);
    }

    fn can_send(&self, message: &Message) -> bool {
        message
            .as_request()
            .is_some_and(|request| self.discriminator.matches(request))
    }

    fn send(&mut self, message: &Message, ctx: &mut Context<'_, M>) -> Result<Progress> {
        assert!(
            self.can_send(message),
            "{}: send() without can_send() for {}",
            self.validator.name(),
            message.describe()
        );
        if let Some(request) = message.as_request() {
            self.core.transmit(self.validator.name(), request, ctx);
        }
        Ok(Progress::Pending)
    }

    fn can_handle(&self, message: &Message) -> bool {
        self.core.awaits(message)
    }

    fn handle(&mut self, message: &Message, ctx: &mut Context<'_, M>) -> Result<Progress> {
        self.core.handle_reply(&mut self.validator, message, ctx)
    }

    fn handles_timeout(&self, id: TimerId) -> bool {
        self.core.handles_timeout(id)
    }
}
