//! Batch sends and id-based reply correlation
//!
//! Replies are matched to calls by `id`, walking the calls in submission
//! order, so a transport that reorders or drops entries cannot misroute a
//! result. Notification slots never look at the reply.

use std::{any::Any, collections::HashMap, marker::PhantomData};

use serde_json::Value;
use tracing::debug;

use crate::{
    client::{
        builder::{Call, Client},
        transport::{Outbound, Transport},
    },
    errors::ClientError,
    rpc::{Id, Request, Schema},
};

type AnyValue = Box<dyn Any + Send>;
type SlotResult = Result<Option<AnyValue>, ClientError>;

struct Pending {
    id: Option<Id>,
    interpret: Box<dyn FnOnce(Option<Value>) -> SlotResult + Send>,
}

/// Handle to one call's result inside a batch.
#[derive(Debug)]
pub struct Slot<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

pub struct Batch<'c, Tr> {
    client: &'c Client<Tr>,
    envelopes: Vec<Request>,
    pending: Vec<Pending>,
}

impl<'c, Tr> Batch<'c, Tr> {
    pub fn push<Q: Schema, S: Schema>(
        &mut self,
        call: Call<Q, S>,
    ) -> Result<Slot<S::Target>, ClientError> {
        let (envelope, interpret) = self.client.prepare(call)?.into_parts();
        let index = self.pending.len();

        self.pending.push(Pending {
            id: envelope.id.clone(),
            interpret: Box::new(move |body| {
                interpret(body).map(|value| value.map(|value| Box::new(value) as AnyValue))
            }),
        });
        self.envelopes.push(envelope);

        Ok(Slot {
            index,
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Sends every call as one array. Fails as a whole only when the reply
    /// is not an array; per-call failures land in their own slot.
    pub async fn send<C>(self, ctx: C) -> Result<BatchResults, ClientError>
    where
        Tr: Transport<C>,
    {
        debug!(size = self.envelopes.len(), "sending rpc batch");
        let reply = self
            .client
            .transport
            .send(Outbound::Batch(self.envelopes), ctx)
            .await?;

        let Some(Value::Array(entries)) = reply else {
            return Err(ClientError::invalid_response("batch reply is not an array"));
        };

        let mut by_id: HashMap<Id, Value> = HashMap::with_capacity(entries.len());
        for entry in entries {
            match entry.get("id").and_then(Id::from_value) {
                Some(id) => {
                    by_id.insert(id, entry);
                }
                None => debug!("ignoring batch reply entry without a usable id"),
            }
        }

        let slots = self
            .pending
            .into_iter()
            .map(|pending| {
                let body = pending.id.and_then(|id| by_id.remove(&id));
                Some((pending.interpret)(body))
            })
            .collect();

        Ok(BatchResults { slots })
    }
}

pub struct BatchResults {
    slots: Vec<Option<SlotResult>>,
}

impl BatchResults {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn take<T: 'static>(&mut self, slot: Slot<T>) -> Result<Option<T>, ClientError> {
        let result = self
            .slots
            .get_mut(slot.index)
            .and_then(Option::take)
            .ok_or_else(|| ClientError::invalid_response("batch slot is not available"))?;

        match result? {
            None => Ok(None),
            Some(value) => value
                .downcast::<T>()
                .map(|value| Some(*value))
                .map_err(|_| ClientError::invalid_response("batch slot belongs to another batch")),
        }
    }
}

impl<Tr> Client<Tr> {
    pub fn batch(&self) -> Batch<'_, Tr> {
        Batch {
            client: self,
            envelopes: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Sends calls of one method as a single batch. Each slot holds its own
    /// outcome, in the order the calls were given.
    pub async fn many<C, Q, S>(
        &self,
        calls: Vec<Call<Q, S>>,
        ctx: C,
    ) -> Result<Vec<Result<Option<S::Target>, ClientError>>, ClientError>
    where
        Tr: Transport<C>,
        Q: Schema,
        S: Schema,
    {
        let mut batch = self.batch();
        let slots = calls
            .into_iter()
            .map(|call| batch.push(call))
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = batch.send(ctx).await?;
        Ok(slots.into_iter().map(|slot| results.take(slot)).collect())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::{
        errors::ClientErrorKind,
        rpc::{Method, Passthrough, SerdeSchema},
    };

    fn double() -> Method<SerdeSchema<i64>, SerdeSchema<i64>> {
        Method::new("double", SerdeSchema::new(), SerdeSchema::new())
    }

    fn label() -> Method<Passthrough, SerdeSchema<String>> {
        Method::new("label", Passthrough, SerdeSchema::new())
    }

    /// Answers every call with `2 * params`, then scrambles the reply.
    struct Scrambled {
        drop_id: Option<i64>,
    }

    #[async_trait]
    impl Transport<()> for Scrambled {
        async fn send(&self, message: Outbound, _ctx: ()) -> Result<Option<Value>, ClientError> {
            let Outbound::Batch(requests) = message else {
                return Err(ClientError::transport("expected a batch"));
            };

            let mut replies: Vec<Value> = requests
                .iter()
                .filter_map(|request| {
                    let id = request.id.clone()?;
                    if matches!(&id, Id::Number(n) if n.as_i64() == self.drop_id) {
                        return None;
                    }
                    let result = match request.method.as_str() {
                        "double" => json!(request.params.as_i64().unwrap_or(0) * 2),
                        _ => json!(format!("#{id}")),
                    };
                    Some(json!({"jsonrpc": "2.0", "id": id, "result": result}))
                })
                .collect();
            replies.reverse();
            replies.push(json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {"code": -32600, "message": "Invalid Request"}
            }));

            Ok(Some(Value::Array(replies)))
        }
    }

    struct NotAnArray;

    #[async_trait]
    impl Transport<()> for NotAnArray {
        async fn send(&self, _message: Outbound, _ctx: ()) -> Result<Option<Value>, ClientError> {
            Ok(Some(json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {"code": -32600, "message": "Invalid Request"}
            })))
        }
    }

    #[tokio::test]
    async fn reordered_reply_resolves_by_id() {
        let client = Client::new(Scrambled { drop_id: None });
        let calls = (1..=4).map(|n| Call::new(&double(), n)).collect();

        let results = client.many(calls, ()).await.expect("batch");
        let values: Vec<Option<i64>> = results
            .into_iter()
            .map(|result| result.expect("slot"))
            .collect();
        assert_eq!(values, vec![Some(2), Some(4), Some(6), Some(8)]);
    }

    #[tokio::test]
    async fn mixed_batch_keeps_typed_slots() {
        let client = Client::new(Scrambled { drop_id: None });
        let mut batch = client.batch();
        let quiet = batch
            .push(Call::new(&double(), 5).notification())
            .expect("push notification");
        let doubled = batch.push(Call::new(&double(), 21)).expect("push double");
        let named = batch.push(Call::new(&label(), json!({}))).expect("push label");
        assert_eq!(batch.len(), 3);

        let mut results = batch.send(()).await.expect("batch");
        assert_eq!(results.take(quiet).expect("notification slot"), None);
        assert_eq!(results.take(doubled).expect("double slot"), Some(42));
        assert_eq!(results.take(named).expect("label slot"), Some("#1".to_string()));
    }

    #[tokio::test]
    async fn dropped_entry_fails_only_its_slot() {
        let client = Client::new(Scrambled { drop_id: Some(1) });
        let calls = (1..=3).map(|n| Call::new(&double(), n)).collect();

        let results = client.many(calls, ()).await.expect("batch");
        assert_eq!(results[0], Ok(Some(2)));
        let err = results[1].clone().expect_err("dropped entry");
        assert_eq!(err.kind, ClientErrorKind::InvalidResponse);
        assert_eq!(results[2], Ok(Some(6)));
    }

    #[tokio::test]
    async fn non_array_reply_fails_whole_batch() {
        let client = Client::new(NotAnArray);
        let calls = vec![Call::new(&double(), 1)];

        let err = client.many(calls, ()).await.expect_err("not an array");
        assert_eq!(err.kind, ClientErrorKind::InvalidResponse);
    }
}
