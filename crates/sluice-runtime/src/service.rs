//! Execution of `service_call` nodes against the record store.

use sluice_codec::{AttributeValue, coerce, encode};
use sluice_config::{AttributeDef, KeyDef, ServiceCall, UpdateAction, UpdateDef};
use sluice_document::Document;
use sluice_store::{AttributeUpdate, Record, RecordKey, RecordStore};

use crate::error::NodeError;

/// Run a persistence call against `input` and shape the store's reply.
///
/// - `put` returns `{}`
/// - `get`, `update` and `delete` return `{"item": {...}}`, or `{}` when
///   there is no record
/// - `query` and `scan` return `{"items": [...], "count": n}`
///
/// A non-empty projection trims returned records to the named attributes.
pub(crate) async fn execute(
  store: &dyn RecordStore,
  call: &ServiceCall,
  input: &Document,
) -> Result<Document, NodeError> {
  match call {
    ServiceCall::Put { item } => {
      let mut record = Record::new();
      for (name, def) in item {
        record.insert(name.clone(), attribute(def, input)?);
      }
      store.put(record).await?;
      Ok(Document::map())
    }
    ServiceCall::Get { key, projection } => {
      let key = record_key(store, key, input)?;
      let record = store.get(&key).await?;
      Ok(item_reply(record.map(|r| project(r, projection))))
    }
    ServiceCall::Update { key, updates } => {
      let key = record_key(store, key, input)?;
      let updates = updates
        .iter()
        .map(|u| attribute_update(u, input))
        .collect::<Result<Vec<_>, _>>()?;
      Ok(item_reply(Some(store.update(&key, &updates).await?)))
    }
    ServiceCall::Delete { key } => {
      let key = record_key(store, key, input)?;
      Ok(item_reply(store.delete(&key).await?))
    }
    ServiceCall::Query {
      partition,
      projection,
    } => {
      let value = encode(&partition.resolve(input)?)?;
      let partition = store.schema().partition_value(&value)?;
      Ok(items_reply(store.query(&partition).await?, projection))
    }
    ServiceCall::Scan { projection } => Ok(items_reply(store.scan().await?, projection)),
  }
}

fn project(record: Record, projection: &[String]) -> Record {
  if projection.is_empty() {
    record
  } else {
    record.project(projection)
  }
}

fn items_reply(records: Vec<Record>, projection: &[String]) -> Document {
  let count = records.len() as i64;
  let items: Vec<Document> = records
    .into_iter()
    .map(|r| project(r, projection).to_document())
    .collect();
  [
    ("items".to_string(), Document::List(items)),
    ("count".to_string(), Document::from(count)),
  ]
  .into_iter()
  .collect()
}

fn attribute(def: &AttributeDef, input: &Document) -> Result<AttributeValue, NodeError> {
  let value = def.source.resolve(input)?;
  Ok(encode(&coerce(value, def.kind)?)?)
}

fn record_key(store: &dyn RecordStore, key: &KeyDef, input: &Document) -> Result<RecordKey, NodeError> {
  let partition = encode(&key.partition.resolve(input)?)?;
  let sort = match &key.sort {
    Some(sort) => Some(encode(&sort.resolve(input)?)?),
    None => None,
  };
  Ok(store.schema().key_from_values(&partition, sort.as_ref())?)
}

fn attribute_update(update: &UpdateDef, input: &Document) -> Result<AttributeUpdate, NodeError> {
  let name = update.attribute.clone();
  let operand = || {
    update.operand.as_ref().ok_or_else(|| NodeError::InvalidInput {
      message: format!("update of '{}' needs an operand", update.attribute),
    })
  };

  Ok(match update.action {
    UpdateAction::Set => AttributeUpdate::Set {
      name,
      value: attribute(operand()?, input)?,
    },
    UpdateAction::Add => AttributeUpdate::Add {
      name,
      value: attribute(operand()?, input)?,
    },
    UpdateAction::Remove => AttributeUpdate::Remove { name },
  })
}

fn item_reply(record: Option<Record>) -> Document {
  match record {
    Some(record) => [("item".to_string(), record.to_document())]
      .into_iter()
      .collect(),
    None => Document::map(),
  }
}
