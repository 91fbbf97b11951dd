use serde::Deserialize;
use serde_json::{json, Value};
use shared::ApiError;

use crate::client::RetryingClient;

/// Discovery-catalog service (Metax-shaped). Datasets are submitted as
/// `{data_catalog, metadata_provider_user, metadata_provider_org,
/// research_dataset: {...}}`; see [`map_to_research_dataset`] for how a
/// submission's `doiInfo` plus per-object fields become that shape.
#[derive(Clone)]
pub struct CatalogClient {
    http: RetryingClient,
    data_catalog: String,
}

#[derive(Deserialize)]
struct CreatedDraftResponse {
    identifier: String,
}

#[derive(Deserialize)]
struct PublishResponse {
    preferred_identifier: String,
}

impl CatalogClient {
    pub fn new(http: RetryingClient, data_catalog: impl Into<String>) -> Self {
        CatalogClient { http, data_catalog: data_catalog.into() }
    }

    pub async fn create_draft(&self, dataset: Value) -> Result<String, ApiError> {
        let response = self.http.post("/rest/v2/datasets", &dataset).await?;
        let body: CreatedDraftResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ExternalServerError(format!("malformed catalog response: {e}")))?;
        Ok(body.identifier)
    }

    pub async fn update(&self, catalog_id: &str, dataset: Value) -> Result<(), ApiError> {
        self.http.put(&format!("/rest/v2/datasets/{catalog_id}"), &dataset).await?;
        Ok(())
    }

    pub async fn bulk_update(&self, datasets: Vec<Value>) -> Result<(), ApiError> {
        self.http.patch("/rest/v2/datasets", &json!(datasets)).await?;
        Ok(())
    }

    pub async fn delete_draft(&self, catalog_id: &str) -> Result<(), ApiError> {
        self.http.delete(&format!("/rest/v2/datasets/{catalog_id}")).await?;
        Ok(())
    }

    pub async fn publish(&self, catalog_id: &str) -> Result<String, ApiError> {
        let response = self.http.post::<()>(&format!("/rpc/v2/datasets/{catalog_id}/publish"), &()).await?;
        let body: PublishResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ExternalServerError(format!("malformed catalog response: {e}")))?;
        Ok(body.preferred_identifier)
    }

    pub async fn health_check(&self) -> bool {
        self.http.get("/rest/v2/datasets/health").await.is_ok()
    }

    pub fn data_catalog(&self) -> &str {
        &self.data_catalog
    }
}

/// Transforms a submission's `doiInfo` merged with a DOI-bearing object's
/// own fields into the catalog's `research_dataset` shape.
///
/// `creator` entries map straight to `person`. `contributor` entries
/// carry a `contributorType` that is split across `rights_holder`,
/// `curator`, and `contributor` roles (the catalog has no single
/// "contributor" bucket). Date fields land on `issued`/`modified` with
/// any extra dated events folded into `temporal[]`. `geoLocations`
/// become WKT strings under `spatial[]`. `alternateIdentifiers` become
/// `other_identifier[]`.
pub fn map_to_research_dataset(preferred_identifier: &str, doi_info: &Value, object: &Value) -> Value {
    let mut rights_holder = Vec::new();
    let mut curator = Vec::new();
    let mut contributor = Vec::new();

    if let Some(list) = doi_info.get("contributor").and_then(Value::as_array) {
        for entry in list {
            let person = json!({ "name": entry.get("name").cloned().unwrap_or(Value::Null) });
            match entry.get("contributorType").and_then(Value::as_str) {
                Some("RightsHolder") => rights_holder.push(person),
                Some("DataCurator") => curator.push(person),
                _ => contributor.push(person),
            }
        }
    }

    let creator: Vec<Value> = doi_info
        .get("creator")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|c| json!({ "name": c.get("name").cloned().unwrap_or(Value::Null) }))
        .collect();

    let spatial: Vec<Value> = doi_info
        .get("geoLocations")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(geo_location_to_wkt)
        .collect();

    let other_identifier: Vec<Value> = doi_info
        .get("alternateIdentifiers")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|a| {
            json!({
                "notation": a.get("alternateIdentifier").cloned().unwrap_or(Value::Null),
                "type": a.get("alternateIdentifierType").cloned().unwrap_or(Value::Null),
            })
        })
        .collect();

    json!({
        "preferred_identifier": preferred_identifier,
        "title": { "en": object.get("title").and_then(Value::as_str).unwrap_or_default() },
        "description": { "en": object.get("description").and_then(Value::as_str).unwrap_or_default() },
        "creator": creator,
        "rights_holder": rights_holder,
        "curator": curator,
        "contributor": contributor,
        "issued": doi_info.get("publicationYear").cloned().unwrap_or(Value::Null),
        "modified": doi_info.get("lastMetadataUpdate").cloned().unwrap_or(Value::Null),
        "temporal": doi_info.get("dates").cloned().unwrap_or_else(|| json!([])),
        "spatial": spatial,
        "other_identifier": other_identifier,
        "access_rights": doi_info.get("accessRights").cloned().unwrap_or_else(|| json!({"access_type": "restricted"})),
        "publisher": doi_info.get("publisher").cloned().unwrap_or_else(|| json!({"name": "CSC"})),
    })
}

fn geo_location_to_wkt(entry: &Value) -> Option<Value> {
    let point = entry.get("geoLocationPoint")?;
    let lat = point.get("pointLatitude").and_then(Value::as_f64)?;
    let lon = point.get("pointLongitude").and_then(Value::as_f64)?;
    Some(json!({ "geometry": format!("POINT({lon} {lat})") }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_contributor_roles_and_maps_geo_location() {
        let doi_info = json!({
            "creator": [{"name": "Jane Doe"}],
            "contributor": [
                {"name": "Data Curators Inc", "contributorType": "DataCurator"},
                {"name": "Rights Org", "contributorType": "RightsHolder"},
                {"name": "Helper", "contributorType": "Other"},
            ],
            "geoLocations": [{"geoLocationPoint": {"pointLatitude": 60.2, "pointLongitude": 24.9}}],
            "alternateIdentifiers": [{"alternateIdentifier": "urn:x", "alternateIdentifierType": "URN"}],
        });
        let object = json!({"title": "t", "description": "d"});

        let dataset = map_to_research_dataset("pref-id", &doi_info, &object);

        assert_eq!(dataset["curator"].as_array().unwrap().len(), 1);
        assert_eq!(dataset["rights_holder"].as_array().unwrap().len(), 1);
        assert_eq!(dataset["contributor"].as_array().unwrap().len(), 1);
        assert_eq!(dataset["spatial"][0]["geometry"], "POINT(24.9 60.2)");
        assert_eq!(dataset["other_identifier"][0]["notation"], "urn:x");
    }
}
