//! Messages exchanged by protocol state machines.

/// The recipient of a message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Recipient<T> {
    /// A single recipient.
    Single(T),

    /// Multiple recipients.
    Multiple(Vec<T>),
}

/// An outgoing message together with its recipient.
///
/// The state machine layer only names recipients; some router outside this
/// crate knows how to deliver a message to whatever the recipient type
/// identifies.
#[derive(Clone, Debug)]
pub struct RecipientMessage<I, O> {
    recipient: Recipient<I>,
    contents: O,
}

impl<I, O> RecipientMessage<I, O> {
    /// Constructs a new message.
    pub fn new(recipient: Recipient<I>, contents: O) -> Self {
        Self { recipient, contents }
    }

    /// The recipient of this message.
    pub fn recipient(&self) -> &Recipient<I> {
        &self.recipient
    }

    /// The contents of this message.
    pub fn contents(&self) -> &O {
        &self.contents
    }

    /// Consumes the message and returns recipient and contents.
    pub fn into_parts(self) -> (Recipient<I>, O) {
        (self.recipient, self.contents)
    }

    /// Wraps the contents with the given constructor.
    ///
    /// Composed state machines use this to lift an inner machine's messages
    /// into the outer machine's message enum, so one routing layer serves
    /// arbitrarily nested protocols.
    pub fn wrap<F, O2>(self, wrapper: F) -> RecipientMessage<I, O2>
    where
        F: Fn(O) -> O2,
    {
        let contents = wrapper(self.contents);
        RecipientMessage::new(self.recipient, contents)
    }
}
