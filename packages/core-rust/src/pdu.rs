//! Decoded protocol data units.

use serde::{Deserialize, Serialize};

use crate::types::VarBind;

// ---------------------------------------------------------------------------
// PduType
// ---------------------------------------------------------------------------

/// Kind of a decoded PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PduType {
    Get,
    GetNext,
    GetBulk,
    Set,
    Response,
}

impl PduType {
    /// Token used in content classification composite strings
    /// (`GET#oid1|oid2|...`).
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            PduType::Get => "GET",
            PduType::GetNext => "GETNEXT",
            PduType::GetBulk => "GETBULK",
            PduType::Set => "SET",
            PduType::Response => "RESPONSE",
        }
    }
}

// ---------------------------------------------------------------------------
// Pdu
// ---------------------------------------------------------------------------

/// Decoded request/response payload: a type tag plus an ordered var-bind
/// list. Threaded by value through the plugin chain, so plugins can
/// rewrite it without touching the caller's copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pdu {
    pub pdu_type: PduType,
    pub request_id: i64,
    pub var_binds: Vec<VarBind>,
}

impl Pdu {
    /// Creates a PDU.
    #[must_use]
    pub fn new(pdu_type: PduType, request_id: i64, var_binds: Vec<VarBind>) -> Self {
        Self {
            pdu_type,
            request_id,
            var_binds,
        }
    }

    /// Content classification composite: the PDU type token joined with
    /// every requested object identifier, `TYPE#oid1|oid2|...`.
    #[must_use]
    pub fn content_composite(&self) -> String {
        let oids = self
            .var_binds
            .iter()
            .map(|vb| vb.oid.to_string())
            .collect::<Vec<_>>()
            .join("|");
        format!("{}#{oids}", self.pdu_type.token())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Oid, VarBind};

    #[test]
    fn content_composite_joins_oids() {
        let pdu = Pdu::new(
            PduType::Get,
            1,
            vec![
                VarBind::request("1.3.6.1.2.1.1.5.0".parse::<Oid>().unwrap()),
                VarBind::request("1.3.6.1.2.1.1.1.0".parse::<Oid>().unwrap()),
            ],
        );
        assert_eq!(
            pdu.content_composite(),
            "GET#1.3.6.1.2.1.1.5.0|1.3.6.1.2.1.1.1.0"
        );
    }

    #[test]
    fn content_composite_empty_var_binds() {
        let pdu = Pdu::new(PduType::GetNext, 7, vec![]);
        assert_eq!(pdu.content_composite(), "GETNEXT#");
    }

    #[test]
    fn tokens_match_wire_names() {
        assert_eq!(PduType::GetBulk.token(), "GETBULK");
        assert_eq!(PduType::Set.token(), "SET");
        assert_eq!(PduType::Response.token(), "RESPONSE");
    }
}
