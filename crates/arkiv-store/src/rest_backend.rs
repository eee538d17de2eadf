use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::time::Duration;

use serde::Serialize;

use arkiv_types::error::{ArkivError, Result};
use arkiv_types::request::{AttachRequest, PolicySpec, TransferReceipt, TransferRequest};
use arkiv_types::ScopedName;

use crate::retry::{classify_body_io, classify_http, retry_transient};
use crate::{CatalogStore, RetryConfig};

const STORE_LABEL: &str = "REST";

/// Catalog store spoken to over HTTP.
pub struct RestCatalog {
    /// Base URL, e.g. "https://catalog.example.org/api"
    base_url: String,
    agent: ureq::Agent,
    token: Option<String>,
    retry: RetryConfig,
}

#[derive(Serialize)]
struct PolicyBody<'a> {
    container: String,
    location: &'a str,
    replicas: u32,
}

#[derive(Serialize)]
struct AttachBody {
    members: Vec<String>,
}

impl RestCatalog {
    pub fn new(base_url: &str, token: Option<&str>, retry: RetryConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(30))
            .timeout_read(Duration::from_secs(300))
            .timeout_write(Duration::from_secs(300))
            .build();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
            token: token.map(|t| t.to_string()),
            retry,
        }
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for seg in segments {
            url.push('/');
            url.push_str(&encode_segment(seg));
        }
        url
    }

    fn apply_auth(&self, req: ureq::Request) -> ureq::Request {
        if let Some(ref token) = self.token {
            req.set("Authorization", &format!("Bearer {token}"))
        } else {
            req
        }
    }

    fn retry_call<T>(&self, op_name: &str, f: impl Fn() -> Result<T>) -> Result<T> {
        retry_transient(&self.retry, op_name, STORE_LABEL, f)
    }

    /// GET a JSON array of `scope:name` strings and parse it into identities.
    fn get_identity_set(
        &self,
        op_name: &str,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<HashSet<ScopedName>> {
        let url = self.url(segments);
        let body = self.retry_call(op_name, || {
            let mut req = self.apply_auth(self.agent.get(&url));
            for (k, v) in query {
                req = req.query(k, v);
            }
            let resp = req
                .call()
                .map_err(|e| classify_http(e, op_name, ArkivError::Store))?;
            let mut buf = Vec::new();
            resp.into_reader()
                .read_to_end(&mut buf)
                .map_err(|e| classify_body_io(e, op_name))?;
            Ok(buf)
        })?;
        parse_identity_list(&body)
            .map_err(|e| ArkivError::Store(format!("{STORE_LABEL} {op_name} parse: {e}")))
    }
}

impl CatalogStore for RestCatalog {
    fn list_items(&self, scope: &str) -> Result<HashSet<ScopedName>> {
        self.get_identity_set("list-items", &["dids", scope], &[("type", "file")])
    }

    fn list_containers(&self, scope: &str) -> Result<HashSet<ScopedName>> {
        self.get_identity_set("list-containers", &["dids", scope], &[("type", "container")])
    }

    fn list_container_members(&self, container: &ScopedName) -> Result<HashSet<ScopedName>> {
        self.get_identity_set(
            "list-members",
            &["dids", &container.scope, &container.name, "members"],
            &[],
        )
    }

    fn list_policies(&self, location: &str) -> Result<HashSet<ScopedName>> {
        self.get_identity_set("list-policies", &["rules"], &[("location", location)])
    }

    fn create_container(&self, container: &ScopedName) -> Result<()> {
        let url = self.url(&["dids", &container.scope, &container.name]);
        let what = container.to_wire();
        self.retry_call("create-container", || {
            self.apply_auth(self.agent.post(&url))
                .send_json(serde_json::json!({ "type": "container" }))
                .map_err(|e| classify_http(e, &what, ArkivError::AlreadyExists))
        })?;
        Ok(())
    }

    fn create_policy(&self, policy: &PolicySpec) -> Result<()> {
        let url = self.url(&["rules"]);
        let body = PolicyBody {
            container: policy.container.to_wire(),
            location: &policy.location,
            replicas: policy.replicas,
        };
        let what = format!("{} -> {}", body.container, policy.location);
        self.retry_call("create-policy", || {
            self.apply_auth(self.agent.post(&url))
                .send_json(&body)
                .map_err(|e| classify_http(e, &what, ArkivError::DuplicatePolicy))
        })?;
        Ok(())
    }

    fn attach_members(&self, container: &ScopedName, items: &[AttachRequest]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let url = self.url(&["dids", &container.scope, &container.name, "members"]);
        let body = AttachBody {
            members: items.iter().map(|a| a.item.to_wire()).collect(),
        };
        let what = container.to_wire();
        self.retry_call("attach-members", || {
            self.apply_auth(self.agent.post(&url))
                .send_json(&body)
                .map_err(|e| classify_http(e, &what, ArkivError::AlreadyExists))
        })?;
        Ok(())
    }

    // Not retried: a failed transfer is left for the next run.
    fn transfer_item(&self, request: &TransferRequest) -> Result<TransferReceipt> {
        let url = self.url(&[
            "replicas",
            &request.location,
            &request.item.scope,
            &request.item.name,
        ]);
        let what = request.item.to_wire();
        let file = File::open(&request.path)?;
        let size = file.metadata()?.len();

        let resp = self
            .apply_auth(self.agent.put(&url))
            .set("Content-Type", "application/octet-stream")
            .set("Content-Length", &size.to_string())
            .set("X-Arkiv-Container", &request.container.to_wire())
            .set(
                "X-Arkiv-Register",
                if request.register_after_transfer {
                    "true"
                } else {
                    "false"
                },
            )
            .send(file)
            .map_err(|e| classify_http(e, &what, ArkivError::AlreadyExists))?;

        let mut body = String::new();
        resp.into_reader()
            .read_to_string(&mut body)
            .map_err(|e| classify_body_io(e, &what))?;
        if body.trim().is_empty() {
            return Ok(TransferReceipt { bytes: size });
        }
        serde_json::from_str(&body)
            .map_err(|e| ArkivError::Store(format!("{STORE_LABEL} transfer {what} parse: {e}")))
    }

    fn clear_partial_transfer(&self, request: &TransferRequest) -> Result<()> {
        let url = self.url(&[
            "replicas",
            &request.location,
            &request.item.scope,
            &request.item.name,
        ]);
        let what = request.item.to_wire();
        match self.retry_call("clear-partial", || {
            self.apply_auth(self.agent.delete(&url))
                .query("partial", "true")
                .call()
                .map_err(|e| classify_http(e, &what, ArkivError::Store))
        }) {
            Ok(_) | Err(ArkivError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn parse_identity_list(body: &[u8]) -> Result<HashSet<ScopedName>> {
    let wires: Vec<String> = serde_json::from_slice(body)?;
    wires.iter().map(|w| ScopedName::parse(w)).collect()
}

/// Percent-encode one URL path segment (RFC 3986 unreserved chars pass through).
fn encode_segment(seg: &str) -> String {
    let mut out = String::with_capacity(seg.len());
    for b in seg.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
