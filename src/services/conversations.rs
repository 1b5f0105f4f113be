//! Conversations list: recent calls with their analyses.

use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::queries::predicates::conversations_query;
use crate::queries::QueryContext;
use crate::services::view::{decode_row, take_embedded, ViewKind};
use crate::signals::{AlertStatus, CallOutcome, Sentiment};
use crate::store::{Query, Table};
use crate::types::{AnalysisRecord, CallRecord, FilterState};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    #[serde(flatten)]
    pub call: CallRecord,
    /// `None` until the call has been analyzed.
    pub analysis: Option<AnalysisRecord>,
    pub outcome: CallOutcome,
    pub sentiment: Sentiment,
    pub alert_status: AlertStatus,
}

impl ConversationEntry {
    pub fn new(call: CallRecord, analysis: Option<AnalysisRecord>) -> Self {
        let outcome = CallOutcome::classify(call.disconnection_reason.as_deref());
        let sentiment = Sentiment::classify(analysis.as_ref().and_then(|a| a.sentiment.as_deref()));
        let alert_status =
            AlertStatus::classify(analysis.as_ref().and_then(|a| a.alert_status.as_deref()));
        Self {
            call,
            analysis,
            outcome,
            sentiment,
            alert_status,
        }
    }
}

/// Decode call rows carrying an embedded `analysis`.
pub(crate) fn decode_calls(rows: Vec<Value>) -> Result<Vec<ConversationEntry>, StoreError> {
    rows.into_iter()
        .map(|mut row| {
            let analysis = take_embedded(&mut row, Table::Analyses.embed_key())?;
            Ok(ConversationEntry::new(decode_row(row)?, analysis))
        })
        .collect()
}

pub struct ConversationsView;

impl ViewKind for ConversationsView {
    type Entry = ConversationEntry;

    fn name(&self) -> &'static str {
        "ConversationsView"
    }

    fn build_query(&self, filter: &FilterState, ctx: &QueryContext) -> Query {
        conversations_query(filter, ctx)
    }

    fn decode(&self, rows: Vec<Value>, _ctx: &QueryContext) -> Result<Vec<ConversationEntry>, StoreError> {
        decode_calls(rows)
    }

    fn entry_id(entry: &ConversationEntry) -> i64 {
        entry.call.id
    }
}
