use dropscope::capture::{EventProcessor, StackRecord, STACK_RECORD_SIZE};
use dropscope::domain::{DecodeError, NetnsId};
use dropscope::symbolization::{StackSymbolizer, SymbolCache};
use std::io::Write;
use tempfile::NamedTempFile;

/// Build a raw record the way the eBPF program lays it out
fn raw_record(netns: u32, frames: &[u64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(STACK_RECORD_SIZE);
    bytes.extend_from_slice(&netns.to_le_bytes());
    bytes.extend_from_slice(&u32::try_from(frames.len() * 8).unwrap().to_le_bytes());
    for frame in frames {
        bytes.extend_from_slice(&frame.to_le_bytes());
    }
    bytes.resize(STACK_RECORD_SIZE, 0);
    bytes
}

fn cache() -> SymbolCache {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "ffffffff81a00000 T kfree_skb_reason\n\
         ffffffff81b00000 T ip_rcv_core\n\
         ffffffff81c00000 T __netif_receive_skb_core [bridge]\n"
    )
    .unwrap();
    SymbolCache::from_kallsyms(file.path()).unwrap()
}

#[test]
fn test_end_to_end_output() {
    let cache = cache();
    let mut processor = EventProcessor::new(StackSymbolizer::new(&cache), Vec::new());

    let record = raw_record(
        4_026_531_840,
        &[0xffff_ffff_81a0_0042, 0xffff_ffff_81b0_0100, 0xffff_ffff_81c0_0000],
    );
    processor.process_bytes(&record).unwrap();

    let stats = processor.stats;
    let output = String::from_utf8(processor.into_inner()).unwrap();
    assert_eq!(
        output,
        "\t4026531840 kfree_skb_reason+0x42\n\
         \t4026531840 ip_rcv_core+0x100\n\
         \t4026531840 __netif_receive_skb_core+0x0\n\
         =======\n"
    );
    assert_eq!(stats.stacks, 1);
    assert_eq!(stats.frames_resolved, 3);
}

#[test]
fn test_unresolved_frames_are_printed_inline() {
    let cache = cache();
    let mut processor = EventProcessor::new(StackSymbolizer::new(&cache), Vec::new());

    processor.process_bytes(&raw_record(7, &[0x1000, 0xffff_ffff_81b0_0008])).unwrap();

    let stats = processor.stats;
    let output = String::from_utf8(processor.into_inner()).unwrap();
    assert_eq!(output, "\t7 1000 <unresolved>\n\t7 ip_rcv_core+0x8\n=======\n");
    assert_eq!(stats.frames_unresolved, 1);
}

#[test]
fn test_malformed_records_do_not_stop_processing() {
    let cache = cache();
    let mut processor = EventProcessor::new(StackSymbolizer::new(&cache), Vec::new());

    // Short, claims 21 frames, then a good one
    processor.process_bytes(&[0u8; 16]).unwrap();
    let mut deep = raw_record(1, &[]);
    deep[4..8].copy_from_slice(&168u32.to_le_bytes());
    processor.process_bytes(&deep).unwrap();
    processor.process_bytes(&raw_record(1, &[0xffff_ffff_81a0_0000])).unwrap();

    let stats = processor.stats;
    assert_eq!(stats.records, 3);
    assert_eq!(stats.decode_errors, 2);
    assert_eq!(stats.stacks, 1);

    let output = String::from_utf8(processor.into_inner()).unwrap();
    assert_eq!(output, "\t1 kfree_skb_reason+0x0\n=======\n");
}

#[test]
fn test_decode_round_trip() {
    let record = StackRecord::decode(&raw_record(7, &[0xAAAA, 0xBBBB])).unwrap();
    assert_eq!(record.netns(), NetnsId(7));
    assert_eq!(record.frames(), &[0xAAAA, 0xBBBB]);
}

#[test]
fn test_decode_rejects_negative_stack_size() {
    // bpf_get_stack error codes arrive as large unsigned sizes
    let mut bytes = raw_record(1, &[]);
    bytes[4..8].copy_from_slice(&(-14i32).to_le_bytes());
    assert!(matches!(StackRecord::decode(&bytes), Err(DecodeError::StackTooDeep { .. })));
}
