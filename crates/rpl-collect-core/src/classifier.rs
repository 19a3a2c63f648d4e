use rpl_collect_abstract::{LogStream, markers};

/// Route a serial message to its log stream. The topology marker takes
/// priority over the routing marker; everything else is plain serial output.
pub fn classify(message: &str) -> LogStream {
    if message.starts_with(markers::TOPOLOGY) {
        LogStream::Topology
    } else if message.starts_with(markers::ROUTING) {
        LogStream::Routing
    } else {
        LogStream::Serial
    }
}
