//! Turns client commands into store mutations and addressed events.

use std::collections::HashMap;

use muralsync_protocol::{ClientCommand, ConnectionId, NoteAdded, ServerEvent, SessionCode};
use muralsync_session::{SessionStore, StoreError, StoreStats};
use tracing::{debug, info};

use crate::Binding;

/// One event addressed to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub event: ServerEvent,
}

impl Delivery {
    pub fn new(to: ConnectionId, event: ServerEvent) -> Self {
        Self { to, event }
    }
}

/// Who an event goes to, resolved against current membership.
#[derive(Debug, Clone, Copy)]
enum Recipient {
    /// Every member of the session, including the originator.
    Members,
    /// Every member except the given connection.
    MembersExcept(ConnectionId),
}

/// Binds connections to sessions and computes fan-out.
///
/// Purely synchronous: every call runs to completion against the store and
/// returns the deliveries it produced. The engine task owns the router and
/// pushes those deliveries onto connection channels.
pub struct BroadcastRouter<S: SessionStore> {
    store: S,
    bindings: HashMap<ConnectionId, Binding>,
}

impl<S: SessionStore> BroadcastRouter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            bindings: HashMap::new(),
        }
    }

    /// Registers a connection as `Unbound`.
    pub fn connect(&mut self, id: ConnectionId) {
        self.bindings.entry(id).or_default();
        debug!(connection_id = %id, "connection registered");
    }

    /// Forgets a connection after an abrupt disconnect. Its membership is
    /// released; nothing is sent since there is no channel left.
    pub fn disconnect(&mut self, id: ConnectionId) {
        self.release(id);
        self.bindings.remove(&id);
        debug!(connection_id = %id, "connection removed");
    }

    /// Current binding of a connection. `None` for an unknown connection.
    pub fn binding(&self, id: ConnectionId) -> Option<&Binding> {
        self.bindings.get(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Drops every binding and every session.
    pub fn shutdown(&mut self) {
        self.bindings.clear();
        self.store.shutdown();
    }

    /// Applies one command from `from` and returns what to send to whom.
    pub fn handle(&mut self, from: ConnectionId, command: ClientCommand) -> Vec<Delivery> {
        debug!(connection_id = %from, command = command.name(), "handling command");

        match command {
            ClientCommand::CreateSession => self.create(from),
            ClientCommand::JoinSession(code) => self.join(from, code),
            ClientCommand::DisconnectFromSession => {
                self.release(from);
                vec![Delivery::new(from, ServerEvent::SessionLeft)]
            }
            ClientCommand::Heartbeat { .. } => Vec::new(),
            content => {
                let Some(code) = self.bound_session(from) else {
                    debug!(
                        connection_id = %from,
                        command = content.name(),
                        "ignoring command from unbound connection"
                    );
                    return Vec::new();
                };
                if !self.is_member(&code, from) {
                    // The session was reaped; the code may since belong to
                    // a new session this connection never joined.
                    self.release(from);
                    debug!(
                        connection_id = %from,
                        %code,
                        command = content.name(),
                        "dropping stale binding"
                    );
                    return Vec::new();
                }
                self.mutate(from, code, content)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Binding transitions
    // -----------------------------------------------------------------------

    fn create(&mut self, from: ConnectionId) -> Vec<Delivery> {
        let code = match self.store.create(from) {
            Ok(code) => code,
            Err(err) => return vec![error_to(from, &err)],
        };

        self.release(from);
        self.bindings.entry(from).or_default().bind(code.clone());

        let snapshot = self
            .store
            .get(&code)
            .map(|s| s.snapshot())
            .unwrap_or_default();
        vec![
            Delivery::new(from, ServerEvent::SessionCreated(code)),
            Delivery::new(from, ServerEvent::SessionData(snapshot)),
        ]
    }

    fn join(&mut self, from: ConnectionId, code: SessionCode) -> Vec<Delivery> {
        if self.store.get(&code).is_none() {
            info!(connection_id = %from, %code, "join with unknown session code");
            return vec![error_to(from, &StoreError::InvalidSessionCode(code))];
        }

        self.release(from);
        if !self.store.add_member(&code, from) {
            return vec![Delivery::new(
                from,
                ServerEvent::Error("Unable to join session".into()),
            )];
        }
        self.bindings.entry(from).or_default().bind(code.clone());

        let snapshot = self
            .store
            .get(&code)
            .map(|s| s.snapshot())
            .unwrap_or_default();
        vec![Delivery::new(from, ServerEvent::SessionData(snapshot))]
    }

    /// Unbinds `from` and removes it from its session's members. A session
    /// that no longer lists `from` is left untouched.
    fn release(&mut self, from: ConnectionId) {
        let previous = self.bindings.get_mut(&from).and_then(Binding::release);
        if let Some(code) = previous {
            if self.is_member(&code, from) {
                self.store.remove_member(&code, from);
            }
        }
    }

    fn is_member(&mut self, code: &SessionCode, id: ConnectionId) -> bool {
        self.store
            .get(code)
            .is_some_and(|session| session.members.contains(&id))
    }

    fn bound_session(&self, from: ConnectionId) -> Option<SessionCode> {
        self.bindings.get(&from)?.session().cloned()
    }

    // -----------------------------------------------------------------------
    // Content mutations
    // -----------------------------------------------------------------------

    fn mutate(
        &mut self,
        from: ConnectionId,
        code: SessionCode,
        command: ClientCommand,
    ) -> Vec<Delivery> {
        let result = match command {
            ClientCommand::AddNote(draft) => {
                let token = draft.correlation_token.clone();
                self.store.add_note(&code, draft).map(|note| {
                    let mut out = vec![Delivery::new(
                        from,
                        ServerEvent::NoteAdded(NoteAdded {
                            note: note.clone(),
                            correlation_token: token,
                        }),
                    )];
                    out.extend(self.resolve(
                        &code,
                        Recipient::MembersExcept(from),
                        ServerEvent::NoteAdded(NoteAdded {
                            note,
                            correlation_token: None,
                        }),
                    ));
                    out
                })
            }
            ClientCommand::UpdateNote(note) => self
                .store
                .update_note(&code, note.clone())
                .map(|()| self.resolve(&code, Recipient::Members, ServerEvent::NoteUpdated(note))),
            ClientCommand::DeleteNote(id) => self
                .store
                .delete_note(&code, &id)
                .map(|()| self.resolve(&code, Recipient::Members, ServerEvent::NoteDeleted(id))),
            ClientCommand::AddText(draft) => self
                .store
                .add_text(&code, draft)
                .map(|text| self.resolve(&code, Recipient::Members, ServerEvent::TextAdded(text))),
            ClientCommand::DeleteText(id) => self
                .store
                .delete_text(&code, &id)
                .map(|()| self.resolve(&code, Recipient::Members, ServerEvent::TextDeleted(id))),
            ClientCommand::Draw(drawing) => {
                self.store.add_drawing(&code, drawing.clone()).map(|()| {
                    self.resolve(
                        &code,
                        Recipient::MembersExcept(from),
                        ServerEvent::Drawing(drawing),
                    )
                })
            }
            ClientCommand::EraseArea(area) => {
                if !self.store.apply_erase(&code, area) {
                    return Vec::new();
                }
                let snapshot = match self.store.get(&code) {
                    Some(session) => session.snapshot(),
                    None => return Vec::new(),
                };
                Ok(self.resolve(&code, Recipient::Members, ServerEvent::SessionData(snapshot)))
            }
            ClientCommand::ClearCanvas => {
                if !self.store.clear(&code) {
                    return Vec::new();
                }
                Ok(self.resolve(&code, Recipient::Members, ServerEvent::CanvasCleared))
            }
            ClientCommand::CreateSession
            | ClientCommand::JoinSession(_)
            | ClientCommand::DisconnectFromSession
            | ClientCommand::Heartbeat { .. } => return Vec::new(),
        };

        match result {
            Ok(deliveries) => {
                self.store.touch(&code);
                deliveries
            }
            Err(err) if err.is_reportable() => {
                debug!(connection_id = %from, %code, error = %err, "command rejected");
                vec![error_to(from, &err)]
            }
            Err(err) => {
                debug!(connection_id = %from, %code, error = %err, "command dropped");
                Vec::new()
            }
        }
    }

    /// Expands a recipient into one delivery per connection, in connection
    /// id order.
    fn resolve(&mut self, code: &SessionCode, to: Recipient, event: ServerEvent) -> Vec<Delivery> {
        let Some(session) = self.store.get(code) else {
            return Vec::new();
        };
        let mut members: Vec<ConnectionId> = session
            .members
            .iter()
            .copied()
            .filter(|id| match to {
                Recipient::Members => true,
                Recipient::MembersExcept(excluded) => *id != excluded,
            })
            .collect();
        members.sort();
        members
            .into_iter()
            .map(|id| Delivery::new(id, event.clone()))
            .collect()
    }
}

fn error_to(to: ConnectionId, err: &StoreError) -> Delivery {
    Delivery::new(to, ServerEvent::Error(err.to_string()))
}
