use aws_sdk_dynamodb::types::AttributeValue;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use uuid::Uuid;

use ops_order_lambda::handlers::order::{
    handle_order_event, ApiGatewayResponse, OrderRecord, OrderStore,
};

struct DynamoOrderStore {
    table_name: String,
    dynamodb_client: aws_sdk_dynamodb::Client,
}

impl OrderStore for DynamoOrderStore {
    fn put_order(&self, record: &OrderRecord) -> Result<(), String> {
        let client = self.dynamodb_client.clone();
        let table_name = self.table_name.clone();
        let record = record.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_item()
                    .table_name(table_name)
                    .item("orderId", AttributeValue::S(record.order_id))
                    .item("product", AttributeValue::S(record.product))
                    .item("quantity", AttributeValue::N(record.quantity.to_string()))
                    .item("status", AttributeValue::S(record.status))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to write order record: {error}"))
            })
        })
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let table_name = std::env::var("ORDERS_TABLE").unwrap_or_else(|_| "Orders".to_string());

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = DynamoOrderStore {
        table_name,
        dynamodb_client: aws_sdk_dynamodb::Client::new(&aws_config),
    };

    Ok(handle_order_event(
        event.payload,
        Uuid::new_v4().to_string(),
        &store,
    ))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
