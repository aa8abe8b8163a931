//! # Codec Round-Trip Tests
//!
//! Integration tests for the chunk codec: the known-good two-file fixture
//! produced by the standard xbstream tooling, golden-byte encoding, dense
//! offset partitioning for large writes, and a proptest round-trip over
//! arbitrary file sets.

use std::collections::BTreeMap;
use std::io::Cursor;

use proptest::prelude::*;
use tokio::io::AsyncReadExt;

use xbstream::{ChunkType, Reader, StreamError, Writer, MIN_CHUNK_SIZE};

/// Archive containing two files, `file1` and `file2`, each 5 bytes long,
/// as written by the standard xbstream binary.
const XB_FIXTURE: [u8; 126] = [
    0x58, 0x42, 0x53, 0x54, 0x43, 0x4b, 0x30, 0x31, 0x00, 0x50, 0x05, 0x00,
    0x00, 0x00, 0x66, 0x69, 0x6c, 0x65, 0x31, 0x05, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x5d,
    0xfe, 0x31, 0x4b, 0x87, 0x19, 0x8b, 0xe0, 0x9a, 0x58, 0x42, 0x53, 0x54,
    0x43, 0x4b, 0x30, 0x31, 0x00, 0x45, 0x05, 0x00, 0x00, 0x00, 0x66, 0x69,
    0x6c, 0x65, 0x31, 0x58, 0x42, 0x53, 0x54, 0x43, 0x4b, 0x30, 0x31, 0x00,
    0x50, 0x05, 0x00, 0x00, 0x00, 0x66, 0x69, 0x6c, 0x65, 0x32, 0x05, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x89, 0x58, 0x8b, 0x97, 0x35, 0xbf, 0x06, 0x38, 0x97, 0x58,
    0x42, 0x53, 0x54, 0x43, 0x4b, 0x30, 0x31, 0x00, 0x45, 0x05, 0x00, 0x00,
    0x00, 0x66, 0x69, 0x6c, 0x65, 0x32,
];

/// Decodes an archive into `(path, chunk descriptors, reassembled bytes)`.
async fn decode_files(bytes: Vec<u8>) -> BTreeMap<Vec<u8>, Vec<u8>> {
    let mut reader = Reader::new(Cursor::new(bytes));
    let mut files: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
    let mut finished: BTreeMap<Vec<u8>, bool> = BTreeMap::new();

    while let Some(chunk) = reader.next_chunk().await.unwrap() {
        assert_ne!(
            finished.get(&chunk.path),
            Some(&true),
            "chunk after EOF for {}",
            chunk.path_lossy()
        );
        match chunk.chunk_type {
            ChunkType::Payload => {
                let info = chunk.payload.unwrap();
                let mut payload = Vec::new();
                reader.payload().read_to_end(&mut payload).await.unwrap();
                assert_eq!(payload.len() as u64, info.length);
                assert_eq!(info.checksum, crc32fast::hash(&payload));

                let file = files.entry(chunk.path.clone()).or_default();
                // The reference producer emits densely packed offsets
                assert_eq!(info.offset, file.len() as u64);
                file.extend_from_slice(&payload);
                finished.entry(chunk.path.clone()).or_insert(false);
            }
            ChunkType::Eof => {
                files.entry(chunk.path.clone()).or_default();
                finished.insert(chunk.path.clone(), true);
            }
            ChunkType::Unknown(_) => unreachable!("reader yields only known types"),
        }
    }

    assert!(
        finished.values().all(|done| *done),
        "file missing its EOF chunk"
    );
    files
}

#[tokio::test]
async fn test_fixture_decodes_to_four_chunks() {
    let mut reader = Reader::new(Cursor::new(XB_FIXTURE.to_vec()));

    // (a) payload chunk of file1
    let chunk = reader.next_chunk().await.unwrap().unwrap();
    assert_eq!(chunk.chunk_type, ChunkType::Payload);
    assert_eq!(chunk.path, b"file1");
    assert_eq!(chunk.flags.bits(), 0);
    let info = chunk.payload.unwrap();
    assert_eq!(info.length, 5);
    assert_eq!(info.offset, 0);
    assert_eq!(info.checksum, 0x4b31_fe5d);
    let mut payload = Vec::new();
    reader.payload().read_to_end(&mut payload).await.unwrap();
    assert_eq!(payload, [0x87, 0x19, 0x8b, 0xe0, 0x9a]);

    // (b) EOF chunk of file1
    let chunk = reader.next_chunk().await.unwrap().unwrap();
    assert_eq!(chunk.chunk_type, ChunkType::Eof);
    assert_eq!(chunk.path, b"file1");
    assert!(chunk.payload.is_none());

    // (c) payload chunk of file2
    let chunk = reader.next_chunk().await.unwrap().unwrap();
    assert_eq!(chunk.chunk_type, ChunkType::Payload);
    assert_eq!(chunk.path, b"file2");
    let info = chunk.payload.unwrap();
    assert_eq!(info.length, 5);
    assert_eq!(info.offset, 0);
    assert_eq!(info.checksum, 0x978b_5889);
    let mut payload = Vec::new();
    reader.payload().read_to_end(&mut payload).await.unwrap();
    assert_eq!(payload, [0x35, 0xbf, 0x06, 0x38, 0x97]);

    // (d) EOF chunk of file2
    let chunk = reader.next_chunk().await.unwrap().unwrap();
    assert_eq!(chunk.chunk_type, ChunkType::Eof);
    assert_eq!(chunk.path, b"file2");

    // Graceful termination, with the whole stream consumed
    assert!(reader.next_chunk().await.unwrap().is_none());
    let mut source = reader.into_inner();
    let mut rest = Vec::new();
    source.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_encoding_matches_golden_fixture() {
    let writer = Writer::new(Cursor::new(Vec::new()));

    let mut file1 = writer.create("file1").unwrap();
    file1.write(&[0x87, 0x19, 0x8b, 0xe0, 0x9a]).await.unwrap();
    file1.close().await.unwrap();

    let mut file2 = writer.create("file2").unwrap();
    file2.write(&[0x35, 0xbf, 0x06, 0x38, 0x97]).await.unwrap();
    file2.close().await.unwrap();

    let bytes = writer.into_inner().unwrap().into_inner();
    assert_eq!(bytes, XB_FIXTURE);
}

#[tokio::test]
async fn test_every_chunk_starts_with_magic() {
    let writer = Writer::new(Cursor::new(Vec::new()));
    let mut file = writer.create("dir/data").unwrap();
    for i in 0..4u8 {
        file.write(&vec![i; 1000]).await.unwrap();
        file.flush().await.unwrap();
    }
    file.close().await.unwrap();

    let bytes = writer.into_inner().unwrap().into_inner();
    assert_eq!(&bytes[..8], b"XBSTCK01");
    // Walk the framing: each chunk boundary must land on a magic
    let mut reader = Reader::new(Cursor::new(bytes));
    let mut chunks = 0;
    while let Some(_chunk) = reader.next_chunk().await.unwrap() {
        reader.discard_payload().await.unwrap();
        chunks += 1;
    }
    assert_eq!(chunks, 5);
}

#[tokio::test]
async fn test_large_single_write_partitions_densely() {
    // A single 25 MiB write does not fit the coalescing buffer and is
    // emitted verbatim as one oversized chunk.
    let total = 25 * 1024 * 1024usize;
    let data: Vec<u8> = (0..total).map(|i| (i % 253) as u8).collect();

    let writer = Writer::new(Cursor::new(Vec::new()));
    let mut file = writer.create("big").unwrap();
    file.write(&data).await.unwrap();
    file.close().await.unwrap();

    let bytes = writer.into_inner().unwrap().into_inner();
    let files = decode_files(bytes).await;
    assert_eq!(files.len(), 1);
    assert_eq!(files[b"big".as_slice()], data);
}

#[tokio::test]
async fn test_buffered_writes_partition_densely() {
    // 25 MiB delivered in 1 MiB pieces alternates buffered and direct
    // chunks; decode_files checks the offsets stay densely packed.
    let piece = vec![0x5au8; 1024 * 1024];
    let pieces = 25;

    let writer = Writer::new(Cursor::new(Vec::new()));
    let mut file = writer.create("big").unwrap();
    for _ in 0..pieces {
        file.write(&piece).await.unwrap();
    }
    file.close().await.unwrap();

    let bytes = writer.into_inner().unwrap().into_inner();

    let mut reader = Reader::new(Cursor::new(bytes.clone()));
    let mut sizes = Vec::new();
    while let Some(chunk) = reader.next_chunk().await.unwrap() {
        if chunk.chunk_type == ChunkType::Payload {
            sizes.push(chunk.payload.unwrap().length);
        }
        reader.discard_payload().await.unwrap();
    }
    assert!(sizes.len() > 1, "expected the stream to split into chunks");
    assert!(sizes.iter().all(|s| *s <= MIN_CHUNK_SIZE as u64));
    assert_eq!(sizes.iter().sum::<u64>(), (pieces * piece.len()) as u64);

    let files = decode_files(bytes).await;
    assert_eq!(files[b"big".as_slice()].len(), pieces * piece.len());
}

#[tokio::test]
async fn test_bad_magic_on_first_chunk() {
    let mut reader = Reader::new(Cursor::new(vec![0u8; 8]));
    let err = reader.next_chunk().await.unwrap_err();
    assert!(matches!(err, StreamError::BadMagic { offset: 0 }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Encoding then decoding any set of files yields the same set,
    /// byte for byte.
    #[test]
    fn prop_codec_round_trip(
        files in prop::collection::btree_map(
            "[a-z0-9_./-]{1,64}",
            prop::collection::vec(any::<u8>(), 0..4096),
            0..8,
        )
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        rt.block_on(async {
            let writer = Writer::new(Cursor::new(Vec::new()));
            for (path, content) in &files {
                let mut file = writer.create(path.as_bytes()).unwrap();
                file.write(content).await.unwrap();
                file.close().await.unwrap();
            }
            let bytes = writer.into_inner().unwrap().into_inner();

            let decoded = decode_files(bytes).await;
            let expected: BTreeMap<Vec<u8>, Vec<u8>> = files
                .iter()
                .map(|(path, content)| (path.as_bytes().to_vec(), content.clone()))
                .collect();
            assert_eq!(decoded, expected);
        });
    }
}
