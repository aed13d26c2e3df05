//! Pipelined batch execution
//!
//! Commands queue locally and go to the store in one round trip on
//! [`Pipeline::execute`]. Replies come back in queue order, one per command.

use std::time::Duration;

use waypoint_domain::error::{Error, Result};
use waypoint_domain::ports::{StoreCommand, StoreReply};
use waypoint_domain::value_objects::SetCondition;

use super::client::CacheClient;

/// A batch of commands bound to one client
#[derive(Debug)]
#[must_use = "a pipeline does nothing until executed"]
pub struct Pipeline<'a> {
    client: &'a CacheClient,
    commands: Vec<StoreCommand>,
}

impl<'a> Pipeline<'a> {
    pub(crate) fn new(client: &'a CacheClient) -> Self {
        Self {
            client,
            commands: Vec::new(),
        }
    }

    fn push(&mut self, command: StoreCommand) -> &mut Self {
        self.commands.push(command);
        self
    }

    fn owned(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    /// Queue `GET`
    pub fn get(&mut self, key: &str) -> &mut Self {
        let key = self.client.key(key);
        self.push(StoreCommand::Get { key })
    }

    /// Queue an unconditional `SET`
    pub fn set(&mut self, key: &str, value: &str, ttl: Option<Duration>) -> &mut Self {
        self.set_with(key, value, ttl, SetCondition::Always)
    }

    /// Queue a conditional `SET`
    pub fn set_with(
        &mut self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
        condition: SetCondition,
    ) -> &mut Self {
        let key = self.client.key(key);
        self.push(StoreCommand::Set {
            key,
            value: value.to_string(),
            ttl,
            condition,
        })
    }

    /// Queue `DEL`
    pub fn delete(&mut self, keys: &[&str]) -> &mut Self {
        let keys = keys.iter().map(|key| self.client.key(key)).collect();
        self.push(StoreCommand::Delete { keys })
    }

    /// Queue `EXISTS`
    pub fn exists(&mut self, keys: &[&str]) -> &mut Self {
        let keys = keys.iter().map(|key| self.client.key(key)).collect();
        self.push(StoreCommand::Exists { keys })
    }

    /// Queue `EXPIRE`
    pub fn expire(&mut self, key: &str, ttl: Duration) -> &mut Self {
        let key = self.client.key(key);
        self.push(StoreCommand::Expire { key, ttl })
    }

    /// Queue `TTL`
    pub fn ttl(&mut self, key: &str) -> &mut Self {
        let key = self.client.key(key);
        self.push(StoreCommand::Ttl { key })
    }

    /// Queue `HGET`
    pub fn hget(&mut self, key: &str, field: &str) -> &mut Self {
        let key = self.client.key(key);
        self.push(StoreCommand::HGet {
            key,
            field: field.to_string(),
        })
    }

    /// Queue `HSET`
    pub fn hset(&mut self, key: &str, field: &str, value: &str) -> &mut Self {
        let key = self.client.key(key);
        self.push(StoreCommand::HSet {
            key,
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    /// Queue `HGETALL`
    pub fn hgetall(&mut self, key: &str) -> &mut Self {
        let key = self.client.key(key);
        self.push(StoreCommand::HGetAll { key })
    }

    /// Queue `HDEL`
    pub fn hdel(&mut self, key: &str, fields: &[&str]) -> &mut Self {
        let key = self.client.key(key);
        let fields = Self::owned(fields);
        self.push(StoreCommand::HDel { key, fields })
    }

    /// Queue `LPUSH`
    pub fn lpush(&mut self, key: &str, values: &[&str]) -> &mut Self {
        let key = self.client.key(key);
        let values = Self::owned(values);
        self.push(StoreCommand::LPush { key, values })
    }

    /// Queue `RPOP`
    pub fn rpop(&mut self, key: &str) -> &mut Self {
        let key = self.client.key(key);
        self.push(StoreCommand::RPop { key })
    }

    /// Queue `LLEN`
    pub fn llen(&mut self, key: &str) -> &mut Self {
        let key = self.client.key(key);
        self.push(StoreCommand::LLen { key })
    }

    /// Queue `SADD`
    pub fn sadd(&mut self, key: &str, members: &[&str]) -> &mut Self {
        let key = self.client.key(key);
        let members = Self::owned(members);
        self.push(StoreCommand::SAdd { key, members })
    }

    /// Queue `SMEMBERS`
    pub fn smembers(&mut self, key: &str) -> &mut Self {
        let key = self.client.key(key);
        self.push(StoreCommand::SMembers { key })
    }

    /// Queue `SISMEMBER`
    pub fn sismember(&mut self, key: &str, member: &str) -> &mut Self {
        let key = self.client.key(key);
        self.push(StoreCommand::SIsMember {
            key,
            member: member.to_string(),
        })
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Queued commands, in send order
    pub fn commands(&self) -> &[StoreCommand] {
        &self.commands
    }

    /// Send every queued command, returning replies in queue order
    pub async fn execute(self) -> Result<Vec<StoreReply>> {
        if self.commands.is_empty() {
            return Ok(Vec::new());
        }

        let store = self.client.store();
        let replies = self
            .client
            .timed("pipeline", store.execute_pipeline(&self.commands))
            .await?;

        if replies.len() != self.commands.len() {
            return Err(Error::cache_operation(format!(
                "Pipeline returned {} replies for {} commands",
                replies.len(),
                self.commands.len()
            )));
        }
        tracing::debug!(
            backend = %store.backend_name(),
            commands = self.commands.len(),
            "Pipeline executed"
        );
        Ok(replies)
    }
}
