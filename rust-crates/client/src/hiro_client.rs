use crate::chain::{
    ChainQueryError,
    ReadOnlyCall,
    ReadOnlyCaller,
};
use clarity_codec::ClarityValue;
use reqwest::StatusCode;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

/// Production [`ReadOnlyCaller`] backed by the Hiro Stacks API.
#[derive(Clone)]
pub struct HiroClient {
    base_url: String,
    http: reqwest::Client,
}

impl HiroClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ChainQueryError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder().build()?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Spendable balance of `address`, in micro-STX.
    pub async fn stx_balance(&self, address: &str) -> Result<u128, ChainQueryError> {
        let url = format!("{}/extended/v1/address/{address}/stx", self.base_url);
        let res = self.http.get(url).send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;
        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }
        let dto: BalanceDto =
            serde_json::from_slice(&bytes).map_err(|err| ChainQueryError::Rejected {
                cause: format!("invalid balance payload: {err}"),
            })?;
        dto.balance
            .parse()
            .map_err(|_| ChainQueryError::Rejected {
                cause: format!("balance {:?} is not an integer", dto.balance),
            })
    }

    fn call_read_url(&self, call: &ReadOnlyCall) -> String {
        format!(
            "{}/v2/contracts/call-read/{}/{}/{}",
            self.base_url, call.contract.address, call.contract.name, call.function_name
        )
    }
}

impl ReadOnlyCaller for HiroClient {
    async fn call_read_only(
        &self,
        call: ReadOnlyCall,
    ) -> Result<ClarityValue, ChainQueryError> {
        let url = self.call_read_url(&call);
        let arguments = call
            .arguments
            .iter()
            .map(ClarityValue::to_hex)
            .collect::<Result<Vec<_>, _>>()?;
        let body = CallReadRequestDto {
            sender: &call.sender,
            arguments,
        };
        debug!(function = call.function_name, network = %call.network, "read-only call");

        let res = self.http.post(url).json(&body).send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;
        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }
        let dto: CallReadResponseDto =
            serde_json::from_slice(&bytes).map_err(|err| ChainQueryError::Rejected {
                cause: format!("invalid call-read payload: {err}"),
            })?;
        dto.into_value()
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> ChainQueryError {
    ChainQueryError::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}

#[derive(Serialize)]
struct CallReadRequestDto<'a> {
    sender: &'a str,
    arguments: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CallReadResponseDto {
    okay: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    cause: Option<String>,
}

impl CallReadResponseDto {
    fn into_value(self) -> Result<ClarityValue, ChainQueryError> {
        match (self.okay, self.result) {
            (true, Some(result)) => Ok(ClarityValue::from_hex(&result)?),
            (true, None) => Err(ChainQueryError::Rejected {
                cause: "okay response without a result".to_string(),
            }),
            (false, _) => Err(ChainQueryError::Rejected {
                cause: self.cause.unwrap_or_else(|| "unknown cause".to_string()),
            }),
        }
    }
}

#[derive(Deserialize)]
struct BalanceDto {
    balance: String,
}
