//! Network actor - runs API calls in Tokio async runtime

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::messages::network::Mutation;
use crate::messages::{NetworkCommand, NetworkResponse};
use crate::network::client::ApiClient;
use crate::network::{documents, loader};

/// Network actor that executes load, mutation, export and import commands
pub struct NetworkActor {
    client: ApiClient,
    export_dir: PathBuf,
    response_tx: mpsc::UnboundedSender<NetworkResponse>,
    active_requests: JoinSet<()>,
}

impl NetworkActor {
    pub fn new(
        client: ApiClient,
        export_dir: PathBuf,
        response_tx: mpsc::UnboundedSender<NetworkResponse>,
    ) -> Self {
        NetworkActor {
            client,
            export_dir,
            response_tx,
            active_requests: JoinSet::new(),
        }
    }

    /// Run the network actor message loop
    pub async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<NetworkCommand>) {
        loop {
            tokio::select! {
                biased;

                // Handle incoming commands
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(NetworkCommand::Shutdown) | None => {
                            self.active_requests.abort_all();
                            break;
                        }
                        Some(cmd) => self.spawn(cmd),
                    }
                }

                // Clean up completed tasks
                Some(_result) = self.active_requests.join_next() => {}
            }
        }
    }

    fn spawn(&mut self, cmd: NetworkCommand) {
        let client = self.client.clone();
        let response_tx = self.response_tx.clone();

        match cmd {
            NetworkCommand::Load { seq, kind, query } => {
                self.active_requests.spawn(async move {
                    tracing::info!(seq, kind = %kind, query = ?query, "Loading collection");
                    let response = match loader::load(&client, kind, query.as_ref()).await {
                        Ok(collections) => {
                            tracing::info!(seq, kind = %kind, "Load completed");
                            NetworkResponse::Loaded { seq, kind, collections }
                        }
                        Err(error) => {
                            tracing::error!(seq, kind = %kind, error = %error, "Load failed");
                            NetworkResponse::LoadFailed { seq, kind, error }
                        }
                    };
                    let _ = response_tx.send(response);
                });
            }

            NetworkCommand::Mutate { id, kind, mutation } => {
                self.active_requests.spawn(async move {
                    tracing::info!(id, kind = %kind, verb = mutation.verb(), "Executing mutation");
                    let result = match &mutation {
                        Mutation::Create(draft) => client.create(draft).await.map(|_| ()),
                        Mutation::Update(record_id, draft) => client.update(*record_id, draft).await.map(|_| ()),
                        Mutation::Delete(record_id) => client.delete(kind, *record_id).await,
                    };
                    let response = match result {
                        Ok(()) => NetworkResponse::Mutated { id, kind },
                        Err(error) => {
                            tracing::error!(id, kind = %kind, error = %error, "Mutation failed");
                            NetworkResponse::MutationFailed { id, kind, error }
                        }
                    };
                    let _ = response_tx.send(response);
                });
            }

            NetworkCommand::Export { id, document, filter } => {
                let export_dir = self.export_dir.clone();
                self.active_requests.spawn(async move {
                    tracing::info!(id, document = ?document, "Exporting document");
                    let response =
                        match documents::export_to_dir(&client, &export_dir, document, &filter).await {
                            Ok(path) => NetworkResponse::Exported { id, path },
                            Err(error) => {
                                tracing::error!(id, error = %error, "Export failed");
                                NetworkResponse::ExportFailed { id, error }
                            }
                        };
                    let _ = response_tx.send(response);
                });
            }

            NetworkCommand::Import { id, path } => {
                self.active_requests.spawn(async move {
                    tracing::info!(id, path = %path.display(), "Importing file");
                    let response = match client.import_file(&path).await {
                        Ok(count) => NetworkResponse::Imported { id, count },
                        Err(error) => {
                            tracing::error!(id, error = %error, "Import failed");
                            NetworkResponse::ImportFailed { id, error }
                        }
                    };
                    let _ = response_tx.send(response);
                });
            }

            NetworkCommand::Shutdown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceKind;
    use crate::network::client::PayloadEncoding;

    #[tokio::test]
    async fn test_unreachable_server_reports_load_failure() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let client = ApiClient::new("http://127.0.0.1:9/api", PayloadEncoding::Multipart);
        let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let actor = NetworkActor::new(client, std::env::temp_dir(), resp_tx);
        let handle = tokio::spawn(actor.run(cmd_rx));

        cmd_tx
            .send(NetworkCommand::Load { seq: 7, kind: ResourceKind::Group, query: None })
            .unwrap();
        match resp_rx.recv().await {
            Some(NetworkResponse::LoadFailed { seq: 7, kind: ResourceKind::Group, error }) => {
                assert_eq!(error.status(), None);
            }
            other => panic!("unexpected {:?}", other),
        }

        cmd_tx.send(NetworkCommand::Shutdown).unwrap();
        handle.await.unwrap();
    }
}
