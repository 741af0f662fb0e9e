//! Turning typed calls into envelopes
//!
//! Each prepared call carries the envelope to send and a closure that knows
//! how to read the reply for that call, so single sends and batches share the
//! same interpretation rules.

use std::sync::atomic::{AtomicI64, Ordering};

use serde_json::Value;
use tracing::debug;

use crate::{
    client::transport::{Outbound, Transport},
    errors::ClientError,
    rpc::{Id, Method, Request, Schema},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Check outbound params against the request schema before sending.
    ///
    /// Only outbound params are affected. Results are decoded through the
    /// response schema even when this is `false`, since the decode is what
    /// produces the typed value; use a `Passthrough` result to receive the
    /// raw JSON unchecked.
    pub validate: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self { validate: true }
    }
}

/// A typed call waiting to be prepared.
pub struct Call<Q: Schema, S: Schema> {
    method: Method<Q, S>,
    params: Q::Target,
    notification: bool,
}

impl<Q: Schema, S: Schema> Call<Q, S> {
    pub fn new(method: &Method<Q, S>, params: Q::Target) -> Self {
        Self {
            method: method.clone(),
            params,
            notification: false,
        }
    }

    /// Sends the call without an id; no reply is expected.
    pub fn notification(mut self) -> Self {
        self.notification = true;
        self
    }
}

pub type Interpreter<T> = Box<dyn FnOnce(Option<Value>) -> Result<Option<T>, ClientError> + Send>;

pub struct Prepared<T> {
    envelope: Request,
    interpret: Interpreter<T>,
}

impl<T> Prepared<T> {
    pub fn envelope(&self) -> &Request {
        &self.envelope
    }

    pub fn id(&self) -> Option<&Id> {
        self.envelope.id.as_ref()
    }

    pub fn into_parts(self) -> (Request, Interpreter<T>) {
        (self.envelope, self.interpret)
    }

    /// Reads the raw reply body for this call. `Ok(None)` is the notification result.
    pub fn resolve(self, body: Option<Value>) -> Result<Option<T>, ClientError> {
        (self.interpret)(body)
    }
}

pub struct Client<Tr> {
    pub(super) transport: Tr,
    options: ClientOptions,
    next_id: AtomicI64,
}

impl<Tr> Client<Tr> {
    pub fn new(transport: Tr) -> Self {
        Self::with_options(transport, ClientOptions::default())
    }

    pub fn with_options(transport: Tr, options: ClientOptions) -> Self {
        Self {
            transport,
            options,
            next_id: AtomicI64::new(0),
        }
    }

    pub fn options(&self) -> ClientOptions {
        self.options
    }

    pub fn prepare<Q: Schema, S: Schema>(
        &self,
        call: Call<Q, S>,
    ) -> Result<Prepared<S::Target>, ClientError> {
        let Call {
            method,
            params,
            notification,
        } = call;

        let wire = method.params().encode(&params).map_err(ClientError::encode)?;
        if self.options.validate {
            method
                .params()
                .decode(wire.clone())
                .map_err(ClientError::encode)?;
        }

        let id = (!notification).then(|| Id::from(self.next_id.fetch_add(1, Ordering::Relaxed)));
        let envelope = Request::new(id, method.name(), wire);
        let interpret: Interpreter<S::Target> =
            Box::new(move |body| interpret_response(&method, notification, body));

        Ok(Prepared {
            envelope,
            interpret,
        })
    }

    /// Sends one call. Notifications resolve to `Ok(None)`.
    pub async fn call<C, Q, S>(
        &self,
        call: Call<Q, S>,
        ctx: C,
    ) -> Result<Option<S::Target>, ClientError>
    where
        Tr: Transport<C>,
        Q: Schema,
        S: Schema,
    {
        let (envelope, interpret) = self.prepare(call)?.into_parts();
        debug!(method = %envelope.method, id = ?envelope.id, "sending rpc call");

        let body = self.transport.send(Outbound::Single(envelope), ctx).await?;
        interpret(body)
    }

    pub async fn request<C, Q, S>(
        &self,
        method: &Method<Q, S>,
        params: Q::Target,
        ctx: C,
    ) -> Result<S::Target, ClientError>
    where
        Tr: Transport<C>,
        Q: Schema,
        S: Schema,
    {
        self.call(Call::new(method, params), ctx)
            .await?
            .ok_or_else(|| ClientError::invalid_response("response carried no result"))
    }

    pub async fn notify<C, Q, S>(
        &self,
        method: &Method<Q, S>,
        params: Q::Target,
        ctx: C,
    ) -> Result<(), ClientError>
    where
        Tr: Transport<C>,
        Q: Schema,
        S: Schema,
    {
        self.call(Call::new(method, params).notification(), ctx)
            .await
            .map(|_| ())
    }
}

fn interpret_response<Q: Schema, S: Schema>(
    method: &Method<Q, S>,
    notification: bool,
    body: Option<Value>,
) -> Result<Option<S::Target>, ClientError> {
    let Some(body) = body else {
        return if notification {
            Ok(None)
        } else {
            Err(ClientError::invalid_response(format!(
                "no response received for `{}`",
                method.name()
            )))
        };
    };

    let Value::Object(mut body) = body else {
        return Err(ClientError::invalid_response("response is not an object"));
    };

    if let Some(error) = body.get("error") {
        return Err(ClientError::from_wire(error));
    }

    let Some(result) = body.remove("result") else {
        return Err(ClientError::invalid_response(
            "response has neither `result` nor `error`",
        ));
    };

    method
        .result()
        .decode(result)
        .map(Some)
        .map_err(ClientError::decode)
}
