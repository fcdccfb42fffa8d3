use std::future::Future;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{error, instrument};
use crate::connection::Connection;
use crate::Result;

/// Destination of generated scripts.
pub trait ScriptExporter: Send {
    fn export_script(&mut self, script: &str) -> impl Future<Output = Result> + Send;

    fn export_scripts<S: AsRef<str> + Sync>(&mut self, scripts: &[S]) -> impl Future<Output = Result> + Send {
        async move {
            for script in scripts {
                self.export_script(script.as_ref()).await?;
            }
            Ok(())
        }
    }

    fn finish(&mut self) -> impl Future<Output = Result> + Send;
}

/// Writes every script followed by `;` and a newline.
pub struct WriterScriptExporter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> WriterScriptExporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterScriptExporter<BufWriter<File>> {
    pub async fn create_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path).await?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: AsyncWrite + Unpin + Send> ScriptExporter for WriterScriptExporter<W> {
    async fn export_script(&mut self, script: &str) -> Result {
        self.writer.write_all(script.as_bytes()).await?;
        self.writer.write_all(b";\n").await?;
        Ok(())
    }

    async fn finish(&mut self) -> Result {
        self.writer.flush().await?;
        Ok(())
    }
}

/// Executes every script on a connection, stopping at the first failure.
pub struct ConnectionScriptExporter<C> {
    connection: C,
    executed: usize,
}

impl<C: Connection> ConnectionScriptExporter<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            executed: 0,
        }
    }

    /// Number of scripts that ran successfully.
    pub fn executed(&self) -> usize {
        self.executed
    }

    pub fn into_inner(self) -> C {
        self.connection
    }
}

impl<C: Connection> ScriptExporter for ConnectionScriptExporter<C> {
    #[instrument(skip_all)]
    async fn export_script(&mut self, script: &str) -> Result {
        if let Err(e) = self.connection.execute(script).await {
            error!("Failed to execute script: {}\n{}", e, script);
            return Err(e);
        }

        self.executed += 1;
        Ok(())
    }

    async fn finish(&mut self) -> Result {
        Ok(())
    }
}
