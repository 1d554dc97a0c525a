use pretty_assertions::assert_eq;
use recordkit_sync::ResponseBuilder;
use serde_json::json;

#[test]
fn sections_keep_order_and_optional_type() {
    let body = ResponseBuilder::new()
        .push_rows(vec![json!({"id": 1})], Some(40), None)
        .push_rows(vec![json!({"id": 9}), json!({"id": 10})], None, Some("Post"))
        .build();

    assert_eq!(
        body,
        json!({"$data": [
            {"rows": [{"id": 1}], "totalRows": 40},
            {"rows": [{"id": 9}, {"id": 10}], "totalRows": 2, "type": "Post"}
        ]})
    );
}

#[test]
fn empty_builder() {
    let builder = ResponseBuilder::new();
    assert!(builder.is_empty());
    assert_eq!(builder.build(), json!({"$data": []}));
}
