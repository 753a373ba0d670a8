use super::attribute::{marshal_item, unmarshal_item};
use crate::prelude::*;
use crate::utils::{optional, parse_json_object, required};
use awskit_core::service::DYNAMODB;
use awskit_core::{poll_until, AwsClient, PollStatus};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// How long `create_table` waits for the table to become ACTIVE.
const TABLE_ACTIVE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DynamoDbOperation {
    CreateTable,
    PutItem,
    GetItem,
    DeleteItem,
}

fn default_partition_key_name() -> String {
    "id".to_string()
}

/// Input for DynamoDB table and item operations
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DynamoDbManagerInput {
    pub operation_type: DynamoDbOperation,

    pub table_name: String,

    #[serde(default = "default_partition_key_name")]
    pub partition_key_name: String,

    /// Partition key value (required for item operations)
    #[serde(default)]
    pub partition_key: Option<String>,

    #[serde(default)]
    pub sort_key_name: Option<String>,

    #[serde(default)]
    pub sort_key: Option<String>,

    /// Item attributes as a JSON object (put_item only)
    #[serde(default)]
    pub item_data: Option<String>,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Create DynamoDB tables and put, get or delete items
pub struct DynamoDbManagerTool {
    config: Arc<ProviderConfig>,
}

impl DynamoDbManagerTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

/// Key attributes of one item, already in AttributeValue form.
fn item_key(input: &DynamoDbManagerInput) -> Result<Map<String, Value>, ToolError> {
    let partition_key = optional(&input.partition_key).ok_or_else(|| {
        ToolError::validation("partition_key is required for item operations")
    })?;
    let mut key = Map::new();
    key.insert(
        required(&input.partition_key_name, "partition_key_name")?.to_string(),
        json!({ "S": partition_key }),
    );
    if let Some(sort_key_name) = optional(&input.sort_key_name) {
        let sort_key = optional(&input.sort_key).ok_or_else(|| {
            ToolError::validation(format!("sort_key is required when sort_key_name ({}) is set", sort_key_name))
        })?;
        key.insert(sort_key_name.to_string(), json!({ "S": sort_key }));
    }
    Ok(key)
}

async fn check_table(client: &AwsClient, table: &str) -> Result<PollStatus<()>, ToolError> {
    let response = client
        .json_rpc(&DYNAMODB, "DescribeTable", &json!({ "TableName": table }))
        .await?;
    match response["Table"]["TableStatus"].as_str().unwrap_or_default() {
        "ACTIVE" => Ok(PollStatus::Done(())),
        other => Ok(PollStatus::Pending(other.to_string())),
    }
}

async fn create_table(
    client: &AwsClient,
    input: &DynamoDbManagerInput,
    table: &str,
    poll_interval: Duration,
) -> Result<ToolResult, ToolError> {
    let partition_key_name = required(&input.partition_key_name, "partition_key_name")?;
    let mut key_schema = vec![json!({ "AttributeName": partition_key_name, "KeyType": "HASH" })];
    let mut definitions = vec![json!({ "AttributeName": partition_key_name, "AttributeType": "S" })];
    if let Some(sort_key_name) = optional(&input.sort_key_name) {
        key_schema.push(json!({ "AttributeName": sort_key_name, "KeyType": "RANGE" }));
        definitions.push(json!({ "AttributeName": sort_key_name, "AttributeType": "S" }));
    }

    let request = json!({
        "TableName": table,
        "KeySchema": key_schema,
        "AttributeDefinitions": definitions,
        "BillingMode": "PAY_PER_REQUEST",
    });
    match client.json_rpc(&DYNAMODB, "CreateTable", &request).await {
        Ok(_) => {}
        Err(ToolError::Upstream(e)) if e.code == "ResourceInUseException" => {
            return Ok(ToolResult::text(format!("Table {} already exists", table)));
        }
        Err(e) => return Err(e),
    }

    poll_until(
        &format!("Table {}", table),
        poll_interval,
        TABLE_ACTIVE_TIMEOUT,
        || check_table(client, table),
    )
    .await?;
    Ok(ToolResult::text(format!("Table {} created successfully", table)))
}

impl Tool for DynamoDbManagerTool {
    type Input = DynamoDbManagerInput;

    fn name(&self) -> &str {
        "dynamodb_manager"
    }

    fn description(&self) -> &str {
        "Manage Amazon DynamoDB: create a table with string keys, or put, get and delete items by key."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let table = required(&input.table_name, "table_name")?.to_string();

        // Validate item parameters up front so no call is made on bad input.
        let (key, item_data) = match input.operation_type {
            DynamoDbOperation::CreateTable => (Map::new(), None),
            DynamoDbOperation::PutItem => (
                item_key(&input)?,
                parse_json_object(&input.item_data, "item_data")?,
            ),
            DynamoDbOperation::GetItem | DynamoDbOperation::DeleteItem => {
                (item_key(&input)?, None)
            }
        };

        let client = self.config.client(&input.credentials).await?;

        match input.operation_type {
            DynamoDbOperation::CreateTable => {
                create_table(&client, &input, &table, self.config.poll_interval).await
            }
            DynamoDbOperation::PutItem => {
                let mut item = marshal_item(&item_data.unwrap_or_default());
                item.extend(key);
                client
                    .json_rpc(&DYNAMODB, "PutItem", &json!({ "TableName": table, "Item": item }))
                    .await?;
                Ok(ToolResult::text(format!("Item added to {} successfully", table)))
            }
            DynamoDbOperation::GetItem => {
                let response = client
                    .json_rpc(&DYNAMODB, "GetItem", &json!({ "TableName": table, "Key": key }))
                    .await?;
                match response["Item"].as_object() {
                    Some(item) => Ok(ToolResult::Json(Value::Object(unmarshal_item(item)))),
                    None => Ok(ToolResult::text("Item not found")),
                }
            }
            DynamoDbOperation::DeleteItem => {
                client
                    .json_rpc(&DYNAMODB, "DeleteItem", &json!({ "TableName": table, "Key": key }))
                    .await?;
                Ok(ToolResult::text(format!("Item deleted from {} successfully", table)))
            }
        }
    }
}
