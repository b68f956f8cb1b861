use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;

use crate::CatalogService;
use crate::HttpResponse;
use crate::ResourceIndex;

pub(crate) fn svc(
    id: &str,
    modify_index: u64,
) -> CatalogService {
    CatalogService {
        service_id: id.to_string(),
        service_name: "web".to_string(),
        service_address: "10.0.0.1".to_string(),
        service_port: 80,
        modify_index,
        ..Default::default()
    }
}

/// `200 OK` with a JSON body and an index header
pub(crate) fn json_response(
    body: serde_json::Value,
    index: u64,
) -> HttpResponse {
    HttpResponse {
        status: 200,
        body: body.to_string().into_bytes(),
        index: ResourceIndex::new(index),
    }
}

pub(crate) fn status_response(
    status: u16,
    body: &str,
    index: u64,
) -> HttpResponse {
    HttpResponse {
        status,
        body: body.as_bytes().to_vec(),
        index: ResourceIndex::new(index),
    }
}

/// Catalog listing of `(service_id, modify_index)` pairs
pub(crate) fn catalog_response(
    services: &[(&str, u64)],
    index: u64,
) -> HttpResponse {
    let body: Vec<_> = services
        .iter()
        .map(|(id, modify_index)| {
            json!({
                "ServiceID": id,
                "ServiceName": "web",
                "ServiceAddress": "10.0.0.1",
                "ServicePort": 80,
                "ServiceTags": null,
                "CreateIndex": modify_index,
                "ModifyIndex": modify_index,
            })
        })
        .collect();
    json_response(json!(body), index)
}

/// KV listing of `(key, value, modify_index)` triples
pub(crate) fn kv_response(
    pairs: &[(&str, &str, u64)],
    index: u64,
) -> HttpResponse {
    let body: Vec<_> = pairs
        .iter()
        .map(|(key, value, modify_index)| {
            json!({
                "Key": key,
                "Value": STANDARD.encode(value),
                "Flags": 0,
                "LockIndex": 0,
                "CreateIndex": modify_index,
                "ModifyIndex": modify_index,
            })
        })
        .collect();
    json_response(json!(body), index)
}
