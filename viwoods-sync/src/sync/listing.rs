use viwoods_core::{ROOT_APP_TYPE, ROOT_FOLDER_NAME, RemoteEntry, ViwoodsClient};

/// Folder listings for the traversal. Any failure reads as an empty folder,
/// which ends traversal of that subtree.
#[derive(Clone)]
pub struct DirectoryLister {
    client: ViwoodsClient,
}

impl DirectoryLister {
    pub fn new(client: ViwoodsClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        app_type: &str,
        folder_name: &str,
        folder_id: Option<&str>,
    ) -> Vec<RemoteEntry> {
        match self
            .client
            .list_child_folder(app_type, folder_name, folder_id)
            .await
        {
            Ok(entries) => {
                tracing::debug!(app_type, folder = folder_name, count = entries.len(), "listed folder");
                entries
            }
            Err(err) => {
                tracing::warn!(
                    app_type,
                    folder = folder_name,
                    class = ?err.classification(),
                    "listing failed: {err}"
                );
                Vec::new()
            }
        }
    }

    pub async fn list_root(&self) -> Vec<RemoteEntry> {
        self.list(ROOT_APP_TYPE, ROOT_FOLDER_NAME, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn failures_read_as_empty_folder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getChildFolderList"))
            .and(query_param("folderName", "Broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/getChildFolderList"))
            .and(query_param("folderName", "Garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let lister = DirectoryLister::new(ViwoodsClient::with_base_url(&server.uri()).unwrap());

        assert!(lister.list("APP_PAPER", "Broken", None).await.is_empty());
        assert!(lister.list("APP_PAPER", "Garbled", None).await.is_empty());
        assert!(lister.list("APP_PAPER", "", None).await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_host_reads_as_empty_root() {
        let lister = DirectoryLister::new(ViwoodsClient::with_base_url("http://127.0.0.1:9").unwrap());
        assert!(lister.list_root().await.is_empty());
    }
}
