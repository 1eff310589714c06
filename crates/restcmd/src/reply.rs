//! Replies sent back by the commanded application on the reply channel.

use crate::error::MalformedReply;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub appname: Option<String>,
    pub cmdid: String,
    pub success: bool,
    pub result: Value,
    pub received_at: String,
}

impl ReplyMessage {
    pub fn new(appname: Option<String>, cmdid: &str, success: bool, result: Value) -> Self {
        Self {
            appname,
            cmdid: cmdid.to_string(),
            success,
            result,
            received_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Decode a raw reply body.
    pub fn from_slice(body: &[u8]) -> Result<Self, MalformedReply> {
        let document: Value =
            serde_json::from_slice(body).map_err(|e| MalformedReply::InvalidJson {
                reason: e.to_string(),
            })?;
        Self::from_json(&document)
    }

    /// Validate a reply document.
    ///
    /// The command id is read from `data.cmdid`, falling back to a top-level
    /// `cmdid`. `success` must be a boolean and `result` must be present,
    /// though it may be null. `appname` is optional.
    pub fn from_json(document: &Value) -> Result<Self, MalformedReply> {
        let fields = document
            .as_object()
            .ok_or_else(|| MalformedReply::invalid("<body>", "a JSON object"))?;

        let cmdid = match fields.get("data").and_then(|data| data.get("cmdid")) {
            Some(cmdid) => cmdid,
            None => fields
                .get("cmdid")
                .ok_or_else(|| MalformedReply::missing("data.cmdid"))?,
        };
        let cmdid = cmdid
            .as_str()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| MalformedReply::invalid("cmdid", "a non-empty string"))?;

        let success = fields
            .get("success")
            .ok_or_else(|| MalformedReply::missing("success"))?
            .as_bool()
            .ok_or_else(|| MalformedReply::invalid("success", "a boolean"))?;

        let result = fields
            .get("result")
            .cloned()
            .ok_or_else(|| MalformedReply::missing("result"))?;

        let appname = match fields.get("appname") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.clone()),
            Some(_) => return Err(MalformedReply::invalid("appname", "a string")),
        };

        Ok(Self::new(appname, cmdid, success, result))
    }

    /// Wire form as produced by the commanded application.
    pub fn to_json(&self) -> Value {
        let mut document = serde_json::json!({
            "data": { "cmdid": self.cmdid },
            "success": self.success,
            "result": self.result,
        });
        if let Some(appname) = &self.appname {
            document["appname"] = Value::String(appname.clone());
        }
        document
    }
}

impl fmt::Display for ReplyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reply:")?;
        if let Some(appname) = &self.appname {
            writeln!(f, "  Application : {appname}")?;
        }
        writeln!(f, "  Command     : {}", self.cmdid)?;
        let status = if self.success { "ok" } else { "failed" };
        match &self.result {
            Value::String(text) => write!(f, "  Result      : [{status}] {text}"),
            other => write!(f, "  Result      : [{status}] {other}"),
        }
    }
}
