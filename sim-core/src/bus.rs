use sim_config::MessageDelivery;
use sim_types::{Message, Recipient, RobotId};
use std::collections::BTreeMap;

/// Per-run mailbox service owned by the simulation.
#[derive(Debug, Clone)]
pub struct MessageBus {
    delivery: MessageDelivery,
    mailboxes: BTreeMap<RobotId, Vec<Message>>,
    deferred: Vec<Message>,
    sent_total: u64,
}

impl MessageBus {
    pub fn new(delivery: MessageDelivery) -> Self {
        Self {
            delivery,
            mailboxes: BTreeMap::new(),
            deferred: Vec::new(),
            sent_total: 0,
        }
    }

    pub fn delivery(&self) -> MessageDelivery {
        self.delivery
    }

    pub fn set_delivery(&mut self, delivery: MessageDelivery) {
        self.delivery = delivery;
    }

    pub fn register(&mut self, id: RobotId) {
        self.mailboxes.entry(id).or_default();
    }

    pub fn sent_total(&self) -> u64 {
        self.sent_total
    }

    pub fn send(&mut self, message: Message) {
        self.sent_total += 1;
        match self.delivery {
            MessageDelivery::Instant => self.deliver(message),
            MessageDelivery::Deferred => self.deferred.push(message),
        }
    }

    /// Takes every message currently visible to `recipient`.
    pub fn drain(&mut self, recipient: RobotId) -> Vec<Message> {
        self.mailboxes
            .get_mut(&recipient)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Releases messages held back for deferred delivery.
    pub fn end_turn(&mut self) {
        for message in std::mem::take(&mut self.deferred) {
            self.deliver(message);
        }
    }

    pub fn clear(&mut self) {
        self.mailboxes.clear();
        self.deferred.clear();
        self.sent_total = 0;
    }

    fn deliver(&mut self, message: Message) {
        match message.recipient {
            Recipient::Robot(id) => {
                if let Some(mailbox) = self.mailboxes.get_mut(&id) {
                    mailbox.push(message);
                }
            }
            Recipient::Broadcast => {
                let sender = message.sender_id;
                for (id, mailbox) in &mut self.mailboxes {
                    if *id != sender {
                        mailbox.push(message.clone());
                    }
                }
            }
        }
    }
}
