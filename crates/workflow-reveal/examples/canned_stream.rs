use std::sync::Arc;

use workflow_reveal::prelude::*;
use workflow_reveal::{ByteStream, WorkflowRequest, WorkflowTransport};

/// Replays a fixed event stream instead of calling the workflow service.
struct CannedTransport;

#[async_trait::async_trait]
impl WorkflowTransport for CannedTransport {
    async fn open(&self, _request: WorkflowRequest) -> Result<ByteStream, RevealError> {
        let frames = [
            "event: Message\ndata: {\"content\":\"{\\\"title\\\":\\\"Demo\\\",\\\"content\\\":\\\"第一段文字。\\\"}\",\"node_id\":\"n1\"}\n\n",
            "event: Message\ndata: {\"content\":\"{\\\"title\\\":\\\"Demo\\\",\\\"content\\\":\\\"第一段文字。第二段文字，继续展示。\\\"}\",\"node_id\":\"n1\"}\n\n",
            "event: Done\ndata: {}\n\n",
        ];
        let chunks = frames
            .into_iter()
            .map(|frame| Ok::<_, RevealError>(bytes::Bytes::from_static(frame.as_bytes())));
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), RevealError> {
    let config = PipelineConfig::home_runner().debug(false);
    let mut controller = RevealController::new(config, Arc::new(CannedTransport))?;
    let mut updates = controller.subscribe();
    let session = controller.submit("https://www.douyin.com/user/demo")?;

    // The run ends before its queued chunks are revealed, so keep printing
    // until the session task itself has finished.
    let mut printed = 0;
    let mut done = std::pin::pin!(session.wait());
    let view = loop {
        tokio::select! {
            result = &mut done => break result?,
            Ok(()) = updates.changed() => {
                let text = updates.borrow_and_update().text.clone();
                print_fresh(&text, &mut printed);
            }
        }
    };
    print_fresh(&view.text, &mut printed);
    println!();
    println!("{:?} title={:?}", view.phase, view.title);
    Ok(())
}

fn print_fresh(text: &str, printed: &mut usize) {
    if let Some(fresh) = text.get(*printed..).filter(|s| !s.is_empty()) {
        print!("{fresh}");
        *printed = text.len();
    }
}
