//! Gateway calls and reply hydration.
//!
//! Hydrating replies come in two shapes. A plain payload (object or array
//! of objects) is stored under the calling entity. A sectioned payload
//! `{ "$data": [{ "rows": [..], "totalRows": n, "type": "Entity" }, ..] }`
//! stores each section under its `type` (default: the calling entity) and
//! updates that entity's total-row counter.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ModelError, ModelResult};
use crate::gateway::{ApiGateway, ApiResponse, Delivery, Replier, RequestId, RoutePath};
use crate::record::Record;
use crate::registry::{FetchCallback, PendingCall, Registry, ReplyMode};

impl Registry {
    /// Resolves route `name` of `entity` to its path and the gateway.
    pub fn api_route(&self, entity: &str, name: &str) -> ModelResult<(RoutePath, Arc<dyn ApiGateway>)> {
        let schema = self.schema(entity)?;
        if schema.routes().is_empty() {
            return Err(ModelError::NoRoutes(entity.to_string()));
        }
        let path = schema
            .routes()
            .get(name)
            .ok_or_else(|| ModelError::UnknownRoute {
                entity: entity.to_string(),
                route: name.to_string(),
            })?;
        let gateway = self
            .gateway
            .as_ref()
            .ok_or_else(|| ModelError::MissingGateway(entity.to_string()))?;
        Ok((path.clone(), Arc::clone(gateway)))
    }

    #[must_use]
    pub fn has_api_route(&self, entity: &str, name: &str) -> bool {
        match self.api_route(entity, name) {
            Ok(_) => true,
            Err(e) => {
                debug!(entity, route = name, error = %e, "api route unavailable");
                false
            }
        }
    }

    fn send(
        &mut self,
        entity: &str,
        name: &str,
        args: Value,
        callback: Option<FetchCallback>,
        mode: ReplyMode,
    ) -> ModelResult<RequestId> {
        let (path, gateway) = self.api_route(entity, name)?;
        let request = self.next_request;
        self.next_request += 1;
        self.pending.insert(
            request,
            PendingCall {
                entity: entity.to_string(),
                route: name.to_string(),
                mode,
                callback,
            },
        );

        debug!(entity, route = %path, request, "gateway call");
        let replier = Replier::new(request, path.clone(), self.tx.clone());
        if let Err(e) = gateway.call(&path, args, replier) {
            self.pending.remove(&request);
            return Err(e);
        }
        self.dispatch_replies();
        Ok(request)
    }

    /// Calls route `name` and stores the returned rows.
    pub fn fetch(
        &mut self,
        entity: &str,
        name: &str,
        args: Value,
        callback: Option<FetchCallback>,
    ) -> ModelResult<RequestId> {
        self.send(entity, name, args, callback, ReplyMode::Hydrate)
    }

    /// Calls route `name` and hands the reply to `callback` untouched.
    pub fn call(
        &mut self,
        entity: &str,
        name: &str,
        args: Value,
        callback: Option<FetchCallback>,
    ) -> ModelResult<RequestId> {
        self.send(entity, name, args, callback, ReplyMode::Raw)
    }

    pub fn fetch_list(
        &mut self,
        entity: &str,
        args: Value,
        callback: Option<FetchCallback>,
    ) -> ModelResult<RequestId> {
        self.fetch(entity, "list", args, callback)
    }

    pub fn fetch_one(
        &mut self,
        entity: &str,
        args: Value,
        callback: Option<FetchCallback>,
    ) -> ModelResult<RequestId> {
        self.fetch(entity, "one", args, callback)
    }

    pub fn fetch_insert(
        &mut self,
        entity: &str,
        args: Value,
        callback: Option<FetchCallback>,
    ) -> ModelResult<RequestId> {
        self.fetch(entity, "insert", args, callback)
    }

    pub fn fetch_update(
        &mut self,
        entity: &str,
        args: Value,
        callback: Option<FetchCallback>,
    ) -> ModelResult<RequestId> {
        self.fetch(entity, "update", args, callback)
    }

    /// Delete replies carry no rows; they are not stored.
    pub fn fetch_delete(
        &mut self,
        entity: &str,
        args: Value,
        callback: Option<FetchCallback>,
    ) -> ModelResult<RequestId> {
        self.call(entity, "delete", args, callback)
    }

    /// Applies every queued reply. Returns how many were applied.
    ///
    /// Synchronous gateways are drained at the end of each call; replies
    /// sent later from other threads wait here until the next dispatch.
    pub fn dispatch_replies(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(delivery) = self.rx.try_recv() {
            let Some(call) = self.pending.remove(&delivery.request) else {
                warn!(request = delivery.request, "reply for unknown request dropped");
                continue;
            };
            applied += 1;
            self.apply_reply(call, delivery);
        }
        applied
    }

    fn apply_reply(&mut self, call: PendingCall, delivery: Delivery) {
        let PendingCall {
            entity,
            route,
            mode,
            mut callback,
        } = call;
        let Delivery { data, response, request } = delivery;
        debug!(entity = %entity, route = %route, request, status = response.status, "gateway reply");

        match mode {
            ReplyMode::Raw => {
                if let Some(callback) = callback.as_mut() {
                    callback(&data, &[], &response);
                }
            }
            ReplyMode::Hydrate => self.hydrate(&entity, &route, &data, &response, callback),
        }
    }

    fn hydrate(
        &mut self,
        entity: &str,
        route: &str,
        data: &Value,
        response: &ApiResponse,
        mut callback: Option<FetchCallback>,
    ) {
        let hooks = match self.schema(entity) {
            Ok(schema) => Arc::clone(schema.hooks()),
            Err(e) => {
                warn!(entity, error = %e, "reply for unregistered entity dropped");
                return;
            }
        };
        hooks.before_fetched(route, data, response);

        if data.is_null() {
            return;
        }
        if let Some(error) = data.get("error") {
            warn!(entity, route, %error, "api replied with an error");
            if let Some(callback) = callback.as_mut() {
                callback(data, &[], response);
            }
            return;
        }

        if let Some(sections) = data.get("$data") {
            for section in sections.as_array().into_iter().flatten() {
                let section_entity = section
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or(entity)
                    .to_string();
                if self.schema(&section_entity).is_err() {
                    warn!(entity = %section_entity, "reply section for unregistered entity skipped");
                    continue;
                }

                hooks.before_sub_fetched(&section_entity, section);
                let records = self.store_rows(&section_entity, section.get("rows"));
                if let Some(total) = section.get("totalRows").and_then(Value::as_u64) {
                    self.store.set_total_rows(&section_entity, total);
                }
                if let Some(callback) = callback.as_mut() {
                    callback(section, &records, response);
                }
                hooks.after_sub_fetched(&section_entity, &records);
            }
        } else {
            let records = self.store_rows(entity, Some(data));
            if let Some(callback) = callback.as_mut() {
                callback(data, &records, response);
            }
            hooks.after_fetched(route, data, &records, response);
        }
    }

    fn store_rows(&mut self, entity: &str, rows: Option<&Value>) -> Vec<Record> {
        let Some(rows) = rows.filter(|r| !r.is_null()) else {
            return Vec::new();
        };
        match self.insert_or_update_value(entity, rows, true) {
            Ok(records) => records,
            Err(e) => {
                warn!(entity, error = %e, "failed to store fetched rows");
                Vec::new()
            }
        }
    }
}
