//! Hosted document-database conversation store.
//!
//! Talks to a document database over HTTP: conversations live as documents
//! in one collection, addressed as
//! `{endpoint}/databases/{db}/collections/{col}/documents[/{id}]`.
//! Requests authenticate with a project id and API key header pair.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use confab_core::error::{ConfabError, Result};
use confab_core::model::{Conversation, now_timestamp};
use confab_core::store::ConversationStore;

const PROJECT_HEADER: &str = "X-Project";
const API_KEY_HEADER: &str = "X-API-Key";

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    pub endpoint: String,
    pub project_id: String,
    pub api_key: String,
    pub database_id: String,
    pub collection_id: String,
}

#[derive(Debug)]
pub struct HttpDocumentStore {
    client: reqwest::Client,
    config: HttpStoreConfig,
}

impl HttpDocumentStore {
    pub fn new(config: HttpStoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.config.endpoint.trim_end_matches('/'),
            self.config.database_id,
            self.config.collection_id
        )
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("{}/{}", self.collection_url(), document_id)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(PROJECT_HEADER, &self.config.project_id)
            .header(API_KEY_HEADER, &self.config.api_key)
    }

    async fn send_error(response: reqwest::Response, action: &str) -> ConfabError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ConfabError::store(format!("{action} failed with status {status}: {body}"))
    }
}

#[async_trait]
impl ConversationStore for HttpDocumentStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Conversation>> {
        let response = self
            .request(self.client.get(self.collection_url()))
            .query(&[
                ("queries[]", equal_query("ownerId", owner_id)),
                ("queries[]", order_desc_query("updatedAt")),
            ])
            .send()
            .await
            .map_err(|e| ConfabError::store(format!("list request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::send_error(response, "list").await);
        }

        let list: DocumentList = response
            .json()
            .await
            .map_err(|e| ConfabError::store(format!("list response decode failed: {e}")))?;
        Ok(list.documents.into_iter().map(Conversation::from).collect())
    }

    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        let response = self
            .request(self.client.get(self.document_url(conversation_id)))
            .send()
            .await
            .map_err(|e| ConfabError::store(format!("fetch request failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::send_error(response, "fetch").await);
        }

        let document: Document = response
            .json()
            .await
            .map_err(|e| ConfabError::store(format!("fetch response decode failed: {e}")))?;
        Ok(Some(document.into()))
    }

    async fn create(&self, owner_id: &str, title: &str) -> Result<Conversation> {
        let now = now_timestamp();
        let body = CreateDocumentRequest {
            document_id: Uuid::new_v4().to_string(),
            data: DocumentData {
                owner_id: owner_id.to_string(),
                title: title.to_string(),
                messages: String::new(),
                created_at: now.clone(),
                updated_at: now,
            },
        };

        let response = self
            .request(self.client.post(self.collection_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| ConfabError::store(format!("create request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::send_error(response, "create").await);
        }

        let document: Document = response
            .json()
            .await
            .map_err(|e| ConfabError::store(format!("create response decode failed: {e}")))?;
        Ok(document.into())
    }

    async fn update_messages(&self, conversation_id: &str, encoded: &str) -> Result<()> {
        let body = UpdateDocumentRequest {
            data: MessagesPatch {
                messages: encoded.to_string(),
                updated_at: now_timestamp(),
            },
        };

        let response = self
            .request(self.client.patch(self.document_url(conversation_id)))
            .json(&body)
            .send()
            .await
            .map_err(|e| ConfabError::store(format!("update request failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ConfabError::not_found("Conversation", conversation_id));
        }
        if !response.status().is_success() {
            return Err(Self::send_error(response, "update").await);
        }
        Ok(())
    }

    async fn rename(&self, conversation_id: &str, title: &str) -> Result<()> {
        // Title-only patch; updatedAt is not bumped so list order keeps
        // tracking message activity.
        let body = UpdateDocumentRequest {
            data: TitlePatch {
                title: title.to_string(),
            },
        };

        let response = self
            .request(self.client.patch(self.document_url(conversation_id)))
            .json(&body)
            .send()
            .await
            .map_err(|e| ConfabError::store(format!("rename request failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ConfabError::not_found("Conversation", conversation_id));
        }
        if !response.status().is_success() {
            return Err(Self::send_error(response, "rename").await);
        }
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        let response = self
            .request(self.client.delete(self.document_url(conversation_id)))
            .send()
            .await
            .map_err(|e| ConfabError::store(format!("delete request failed: {e}")))?;

        // Deleting a missing document is not an error.
        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }
        Err(Self::send_error(response, "delete").await)
    }
}

fn equal_query(attribute: &str, value: &str) -> String {
    format!(
        r#"equal("{attribute}", [{}])"#,
        serde_json::to_string(value).unwrap_or_default()
    )
}

fn order_desc_query(attribute: &str) -> String {
    format!(r#"orderDesc("{attribute}")"#)
}

// Wire types

#[derive(Debug, Deserialize)]
struct DocumentList {
    documents: Vec<Document>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    #[serde(rename = "$id")]
    id: String,
    #[serde(flatten)]
    data: DocumentData,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentData {
    owner_id: String,
    title: String,
    #[serde(default)]
    messages: String,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDocumentRequest {
    document_id: String,
    data: DocumentData,
}

#[derive(Debug, Serialize)]
struct UpdateDocumentRequest<T: Serialize> {
    data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessagesPatch {
    messages: String,
    updated_at: String,
}

#[derive(Debug, Serialize)]
struct TitlePatch {
    title: String,
}

impl From<Document> for Conversation {
    fn from(document: Document) -> Self {
        Conversation {
            id: document.id,
            owner_id: document.data.owner_id,
            title: document.data.title,
            messages: document.data.messages,
            created_at: document.data.created_at,
            updated_at: document.data.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_decodes_envelope() {
        let json = r#"{
            "$id": "doc-1",
            "ownerId": "owner-1",
            "title": "Chat",
            "messages": "[]",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-02T00:00:00.000Z"
        }"#;
        let document: Document = serde_json::from_str(json).unwrap();
        let conversation = Conversation::from(document);

        assert_eq!(conversation.id, "doc-1");
        assert_eq!(conversation.owner_id, "owner-1");
        assert_eq!(conversation.messages, "[]");
        assert_eq!(conversation.updated_at, "2024-01-02T00:00:00.000Z");
    }

    #[test]
    fn test_document_missing_messages_defaults_to_empty() {
        let json = r#"{
            "$id": "doc-2",
            "ownerId": "owner-1",
            "title": "Fresh",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z"
        }"#;
        let document: Document = serde_json::from_str(json).unwrap();
        assert!(document.data.messages.is_empty());
    }

    #[test]
    fn test_query_builders() {
        assert_eq!(
            equal_query("ownerId", "owner-1"),
            r#"equal("ownerId", ["owner-1"])"#
        );
        assert_eq!(order_desc_query("updatedAt"), r#"orderDesc("updatedAt")"#);
    }

    #[test]
    fn test_create_request_shape() {
        let request = CreateDocumentRequest {
            document_id: "doc-3".to_string(),
            data: DocumentData {
                owner_id: "owner-1".to_string(),
                title: "New Conversation".to_string(),
                messages: String::new(),
                created_at: "2024-01-01T00:00:00.000Z".to_string(),
                updated_at: "2024-01-01T00:00:00.000Z".to_string(),
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["documentId"], "doc-3");
        assert_eq!(value["data"]["ownerId"], "owner-1");
        assert_eq!(value["data"]["messages"], "");
    }

    #[test]
    fn test_title_patch_omits_updated_at() {
        let request = UpdateDocumentRequest {
            data: TitlePatch {
                title: "Renamed".to_string(),
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["data"]["title"], "Renamed");
        assert!(value["data"].get("updatedAt").is_none());
    }

    #[test]
    fn test_collection_url_trims_trailing_slash() {
        let store = HttpDocumentStore::new(HttpStoreConfig {
            endpoint: "https://db.example/v1/".to_string(),
            project_id: "proj".to_string(),
            api_key: "key".to_string(),
            database_id: "main".to_string(),
            collection_id: "conversations".to_string(),
        });
        assert_eq!(
            store.collection_url(),
            "https://db.example/v1/databases/main/collections/conversations/documents"
        );
    }
}
