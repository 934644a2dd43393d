use super::{Cursor, Error, EventLog, EventPage, OperationStatus, VoteEvent};
use reqwest::{blocking::Client, Url};
use serde::Deserialize;
use serde_json::Value;
use snapshot_lib::{Address, ContractAddress, Height};
use std::time::Duration;

/// Operations of a contract as indexed by Better Call Dev.
pub struct BetterCallDev {
    client: Client,
    url: Url,
    request_delay: Duration,
}

#[derive(Deserialize)]
struct OperationsPage {
    #[serde(default)]
    operations: Vec<Operation>,
    #[serde(default)]
    last_id: Option<LastId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LastId {
    Text(String),
    Number(u64),
}

impl From<LastId> for Cursor {
    fn from(id: LastId) -> Self {
        match id {
            LastId::Text(id) => Cursor(id),
            LastId::Number(id) => Cursor(id.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct Operation {
    level: Height,
    source: Address,
    status: OperationStatus,
    #[serde(default)]
    entrypoint: Option<String>,
    #[serde(default)]
    parameters: Vec<Parameter>,
}

/// Node of the decoded parameter tree
#[derive(Deserialize)]
struct Parameter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    children: Vec<Parameter>,
}

impl Parameter {
    fn child_str(&self, index: usize) -> Option<String> {
        self.children
            .get(index)
            .and_then(|child| child.value.as_str())
            .map(str::to_owned)
    }
}

impl From<Operation> for VoteEvent {
    // the vote entrypoint takes a pair of the proposal hash and the ballot
    fn from(op: Operation) -> Self {
        let vote = op
            .parameters
            .first()
            .filter(|p| p.name.as_deref() == Some(super::VOTE_ENTRYPOINT));
        Self {
            voter: op.source,
            height: op.level,
            status: op.status,
            entrypoint: op.entrypoint,
            proposal: vote.and_then(|p| p.child_str(0)),
            ballot: vote.and_then(|p| p.child_str(1)),
        }
    }
}

impl BetterCallDev {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.better-call.dev";

    pub fn new(base: &str, network: &str, contract: &ContractAddress) -> Result<Self, Error> {
        let mut url =
            Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(base.to_owned()))?
            .pop_if_empty()
            .extend(["v1", "contract", network, contract.as_str(), "operations"]);
        Ok(Self {
            client: Client::new(),
            url,
            request_delay: Duration::ZERO,
        })
    }

    /// Waits `delay` before every request, the public API is rate limited.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }
}

impl EventLog for BetterCallDev {
    fn page(&self, cursor: Option<&Cursor>) -> Result<EventPage, Error> {
        if !self.request_delay.is_zero() {
            std::thread::sleep(self.request_delay);
        }
        let mut request = self.client.get(self.url.clone());
        if let Some(cursor) = cursor {
            request = request.query(&[("last_id", cursor.0.as_str())]);
        }
        let response = request.send()?;
        if !response.status().is_success() {
            return Err(Error::Status {
                url: response.url().to_string(),
                status: response.status().as_u16(),
            });
        }

        let page: OperationsPage = response.json()?;
        Ok(EventPage {
            events: page.operations.into_iter().map(VoteEvent::from).collect(),
            next_cursor: page.last_id.map(Cursor::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    const CONTRACT: &str = "KT1VgUR7yCtiUZYPrGfuLsibTUrqF4gPprHN";
    const HASH: &str = "ipfs://QmY28KtSZgR3DCEuByxe3feVBjoYTHYerRnZcn8BwBq3Cv";

    fn vote_operation(source: &str, level: u64, ballot: &str) -> serde_json::Value {
        json!({
            "level": level,
            "source": source,
            "status": "applied",
            "entrypoint": "vote",
            "parameters": [{
                "prim": "pair",
                "type": "namedtuple",
                "name": "vote",
                "children": [
                    { "prim": "string", "type": "string", "name": "proposal_hash", "value": HASH },
                    { "prim": "nat", "type": "nat", "name": "ballot", "value": ballot }
                ]
            }]
        })
    }

    fn path() -> String {
        format!("/v1/contract/mainnet/{}/operations", CONTRACT)
    }

    #[test]
    fn decodes_vote_operations() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path(path());
            then.status(200).json_body(json!({
                "operations": [
                    vote_operation("tz1voter", 1_791_000, "1"),
                    {
                        "level": 1_790_000,
                        "source": "tz1admin",
                        "status": "backtracked",
                        "entrypoint": "propose",
                        "parameters": [{ "name": "propose", "value": "ipfs://x" }]
                    },
                    { "level": 1, "source": "tz1origin", "status": "applied" }
                ],
                "last_id": "51234"
            }));
        });

        let log = BetterCallDev::new(&server.base_url(), "mainnet", &CONTRACT.to_owned()).unwrap();
        let page = log.page(None).unwrap();

        mock.assert();
        assert_eq!(page.next_cursor, Some(Cursor("51234".to_owned())));
        assert_eq!(
            page.events[0],
            VoteEvent {
                voter: "tz1voter".to_owned(),
                height: 1_791_000,
                status: OperationStatus::Applied,
                entrypoint: Some("vote".to_owned()),
                proposal: Some(HASH.to_owned()),
                ballot: Some("1".to_owned()),
            }
        );
        assert_eq!(page.events[1].status, OperationStatus::Backtracked);
        assert_eq!(page.events[1].proposal, None);
        assert_eq!(page.events[2].entrypoint, None);
    }

    #[test]
    fn passes_cursor_as_last_id() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path(path()).query_param("last_id", "51234");
            then.status(200).json_body(json!({ "operations": [], "last_id": 0 }));
        });

        let log = BetterCallDev::new(&server.base_url(), "mainnet", &CONTRACT.to_owned()).unwrap();
        let page = log.page(Some(&Cursor("51234".to_owned()))).unwrap();

        mock.assert();
        assert!(page.events.is_empty());
        assert_eq!(page.next_cursor, Some(Cursor("0".to_owned())));
    }

    #[test]
    fn rate_limited_responses_are_fatal() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(429);
        });

        let log = BetterCallDev::new(&server.base_url(), "mainnet", &CONTRACT.to_owned()).unwrap();
        assert!(matches!(
            log.page(None),
            Err(Error::Status { status: 429, .. })
        ));
    }
}
