use anyhow::anyhow;
use std::str;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TftpPacket {
    RRQ {
        filename: String,
        mode: String,
        options: Vec<(String, String)>,
    },
    WRQ {
        filename: String,
        mode: String,
        options: Vec<(String, String)>,
    },
    DATA {
        block: u16,
        data: Vec<u8>,
    },
    ACK(u16),
    ERROR {
        code: u16,
        msg: String,
    },
    OACK(Vec<(String, String)>),
}

impl TftpPacket {
    /// Build a read or write request with the client's option block:
    /// `blksize` always, `tsize` appended only for write requests.
    pub fn request(
        is_write: bool,
        filename: &str,
        mode: &str,
        block_size: u16,
        tsize: Option<u64>,
    ) -> Self {
        let mut options = vec![("blksize".to_string(), block_size.to_string())];
        if is_write {
            if let Some(size) = tsize {
                options.push(("tsize".to_string(), size.to_string()));
            }
            TftpPacket::WRQ {
                filename: filename.to_string(),
                mode: mode.to_string(),
                options,
            }
        } else {
            TftpPacket::RRQ {
                filename: filename.to_string(),
                mode: mode.to_string(),
                options,
            }
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = vec![0];

        match self {
            TftpPacket::RRQ {
                filename,
                mode,
                options,
            }
            | TftpPacket::WRQ {
                filename,
                mode,
                options,
            } => {
                if let TftpPacket::RRQ { .. } = self {
                    bytes.push(1);
                } else {
                    bytes.push(2);
                }
                bytes.extend(filename.as_bytes());
                bytes.push(0);
                bytes.extend(mode.as_bytes());
                bytes.push(0);
                for (key, value) in options {
                    bytes.extend(key.as_bytes());
                    bytes.push(0);
                    bytes.extend(value.as_bytes());
                    bytes.push(0);
                }
            }
            TftpPacket::DATA { block, data } => {
                bytes.push(3);
                bytes.push(block.to_be_bytes()[0]);
                bytes.push(block.to_be_bytes()[1]);
                bytes.extend_from_slice(data);
            }
            TftpPacket::ACK(block) => {
                bytes.push(4);
                bytes.push(block.to_be_bytes()[0]);
                bytes.push(block.to_be_bytes()[1]);
            }
            TftpPacket::ERROR { code, msg } => {
                bytes.push(5);
                // Outgoing codes are narrowed to one byte behind a zero byte.
                bytes.push(0);
                bytes.push((code & 0xff) as u8);
                bytes.extend_from_slice(msg.as_bytes());
                bytes.push(0);
            }
            TftpPacket::OACK(options) => {
                bytes.push(6);
                for (key, value) in options {
                    bytes.extend_from_slice(key.as_bytes());
                    bytes.push(0);
                    bytes.extend_from_slice(value.as_bytes());
                    bytes.push(0);
                }
            }
        }
        bytes
    }

    pub fn deserialize(buf: &[u8]) -> anyhow::Result<Self> {
        if buf.len() < 2 {
            return Err(anyhow!("Packet length too short"));
        }

        let opcode = u16::from_be_bytes([buf[0], buf[1]]);
        let pkt = match opcode {
            1 | 2 => {
                let filename = read_cstr(&buf[2..])?;
                let mode = read_cstr(&buf[2 + filename.len() + 1..])?;
                let options = read_options(&buf[2 + filename.len() + 1 + mode.len() + 1..])?;
                if opcode == 1 {
                    TftpPacket::RRQ {
                        filename,
                        mode,
                        options,
                    }
                } else {
                    TftpPacket::WRQ {
                        filename,
                        mode,
                        options,
                    }
                }
            }
            3 => {
                if buf.len() < 4 {
                    return Err(anyhow!("Truncated DATA packet"));
                }
                let block = u16::from_be_bytes([buf[2], buf[3]]);
                let data = buf[4..].to_vec();

                TftpPacket::DATA { block, data }
            }
            4 => {
                if buf.len() < 4 {
                    return Err(anyhow!("Truncated ACK packet"));
                }
                TftpPacket::ACK(u16::from_be_bytes([buf[2], buf[3]]))
            }
            5 => {
                if buf.len() < 4 {
                    return Err(anyhow!("Truncated ERROR packet"));
                }
                let code = u16::from_be_bytes([buf[2], buf[3]]);
                let msg = read_cstr(&buf[4..])?;

                TftpPacket::ERROR { code, msg }
            }
            6 => TftpPacket::OACK(read_options(&buf[2..])?),
            _ => {
                return Err(anyhow!("Invalid opcode: {}", opcode));
            }
        };

        Ok(pkt)
    }
}

fn read_cstr(buf: &[u8]) -> anyhow::Result<String> {
    let pos = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or(anyhow!("Missing cstr terminator"))?;
    let s = str::from_utf8(&buf[..pos])
        .map_err(|_| anyhow!("Invalid cstr encoding"))?
        .to_string();
    Ok(s)
}

// Option pairs in wire order.
fn read_options(buf: &[u8]) -> anyhow::Result<Vec<(String, String)>> {
    let mut options = Vec::new();
    let mut pos = 0;
    while pos < buf.len() {
        let key_end = buf[pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(anyhow!("Missing option key terminator"))?;
        let key = str::from_utf8(&buf[pos..pos + key_end])
            .map_err(|_| anyhow!("Invalid option key encoding"))?
            .to_string();
        pos += key_end + 1;

        let value_end = buf[pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(anyhow!("Missing option value terminator"))?;
        let value = str::from_utf8(&buf[pos..pos + value_end])
            .map_err(|_| anyhow!("Invalid option value encoding"))?
            .to_string();
        pos += value_end + 1;

        options.push((key, value));
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_request_wire_layout() {
        let pkt = TftpPacket::request(false, "boot.img", "octet", 1024, None);
        let bytes = pkt.serialize();
        assert_eq!(
            bytes,
            b"\x00\x01boot.img\x00octet\x00blksize\x001024\x00".to_vec()
        );
    }

    #[test]
    fn write_request_appends_tsize_after_blksize() {
        let pkt = TftpPacket::request(true, "up.bin", "netascii", 512, Some(70_000));
        let bytes = pkt.serialize();
        assert_eq!(
            bytes,
            b"\x00\x02up.bin\x00netascii\x00blksize\x00512\x00tsize\x0070000\x00".to_vec()
        );
    }

    #[test]
    fn read_request_carries_no_tsize() {
        let pkt = TftpPacket::request(false, "f", "octet", 512, Some(123));
        match pkt {
            TftpPacket::RRQ { options, .. } => {
                assert_eq!(options, vec![("blksize".to_string(), "512".to_string())]);
            }
            other => panic!("expected RRQ, got {other:?}"),
        }
    }

    #[test]
    fn data_roundtrip() {
        let payload: Vec<u8> = (0u8..=255).collect();
        let bytes = TftpPacket::DATA {
            block: 42,
            data: payload.clone(),
        }
        .serialize();
        assert_eq!(&bytes[..4], &[0, 3, 0, 42]);
        match TftpPacket::deserialize(&bytes).unwrap() {
            TftpPacket::DATA { block, data } => {
                assert_eq!(block, 42);
                assert_eq!(data, payload);
            }
            other => panic!("expected DATA, got {other:?}"),
        }
    }

    #[test]
    fn data_block_wraps_at_u16() {
        let block = u16::MAX.wrapping_add(1);
        let bytes = TftpPacket::DATA {
            block,
            data: vec![],
        }
        .serialize();
        assert_eq!(bytes, vec![0, 3, 0, 0]);
    }

    #[test]
    fn empty_data_payload_roundtrip() {
        let bytes = TftpPacket::DATA {
            block: 7,
            data: vec![],
        }
        .serialize();
        match TftpPacket::deserialize(&bytes).unwrap() {
            TftpPacket::DATA { block, data } => {
                assert_eq!(block, 7);
                assert!(data.is_empty());
            }
            other => panic!("expected DATA, got {other:?}"),
        }
    }

    #[test]
    fn ack_roundtrip_extremes() {
        for block in [0u16, 1, 512, u16::MAX] {
            let bytes = TftpPacket::ACK(block).serialize();
            assert_eq!(bytes.len(), 4);
            assert_eq!(
                TftpPacket::deserialize(&bytes).unwrap(),
                TftpPacket::ACK(block)
            );
        }
    }

    #[test]
    fn error_code_narrowed_to_one_byte() {
        let bytes = TftpPacket::ERROR {
            code: 1,
            msg: "File not found.".to_string(),
        }
        .serialize();
        assert_eq!(&bytes[..4], &[0, 5, 0, 1]);
        assert_eq!(*bytes.last().unwrap(), 0);
        assert_eq!(&bytes[4..bytes.len() - 1], b"File not found.");
    }

    #[test]
    fn error_decode_reads_full_code_field() {
        let mut bytes = vec![0, 5, 1, 0];
        bytes.extend_from_slice(b"big code\x00");
        match TftpPacket::deserialize(&bytes).unwrap() {
            TftpPacket::ERROR { code, msg } => {
                assert_eq!(code, 256);
                assert_eq!(msg, "big code");
            }
            other => panic!("expected ERROR, got {other:?}"),
        }
    }

    #[test]
    fn oack_options_keep_wire_order() {
        let bytes = b"\x00\x06blksize\x002048\x00tsize\x00999\x00";
        match TftpPacket::deserialize(bytes).unwrap() {
            TftpPacket::OACK(options) => {
                assert_eq!(
                    options,
                    vec![
                        ("blksize".to_string(), "2048".to_string()),
                        ("tsize".to_string(), "999".to_string()),
                    ]
                );
            }
            other => panic!("expected OACK, got {other:?}"),
        }
    }

    #[test]
    fn rejects_short_and_unknown_packets() {
        assert!(TftpPacket::deserialize(&[]).is_err());
        assert!(TftpPacket::deserialize(&[0]).is_err());
        assert!(TftpPacket::deserialize(&[0, 9, 0, 0]).is_err());
        assert!(TftpPacket::deserialize(&[0, 3, 0]).is_err());
    }

    #[test]
    fn rejects_unterminated_error_message() {
        assert!(TftpPacket::deserialize(b"\x00\x05\x00\x01no nul").is_err());
    }
}
