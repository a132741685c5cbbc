//! Line-oriented terminal front-end for the widget.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::transcript::Sender;
use super::transport::RelayTransport;
use super::widget::{ChatWidget, WidgetEvent};

const TYPING_INDICATOR: &str = "AI is typing...";

/// Feed each input line to the widget and write every event to `output`.
///
/// Returns the writer once input is exhausted and every in-flight request
/// has settled.
pub async fn run_terminal<T, R, W>(widget: ChatWidget<T>, input: R, output: W) -> anyhow::Result<W>
where
    T: RelayTransport,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut events = widget.subscribe();
    let printer = tokio::spawn(async move {
        let mut output = output;
        while let Some(event) = events.recv().await {
            let line = match event {
                WidgetEvent::Appended(message) => match message.sender() {
                    Sender::User => format!("you> {}\n", message.text()),
                    Sender::Assistant => format!("ai> {}\n", message.text()),
                },
                WidgetEvent::Loading(true) => format!("{}\n", TYPING_INDICATOR),
                WidgetEvent::Loading(false) => continue,
            };
            output.write_all(line.as_bytes()).await?;
            output.flush().await?;
        }
        Ok::<W, std::io::Error>(output)
    });

    let mut lines = input.lines();
    let mut in_flight = Vec::new();
    while let Some(line) = lines.next_line().await? {
        widget.set_input(line);
        if let Some(handle) = widget.submit() {
            in_flight.push(handle);
        }
    }

    for handle in in_flight {
        handle.await?;
    }

    // With the widget and every call gone the event channel closes and the
    // printer drains what is left, then stops.
    drop(widget);
    Ok(printer.await??)
}
