//! Payload producers, one per box type. Each writes the box body (everything
//! after the 8-byte header) and returns the bytes written.

use std::io::{Seek, Write};

use super::esds::{self, EsdsFields};
use super::sample_table::SampleTable;
use super::session::Session;
use super::tags;
use super::wire::Wire;
use crate::error::{MuxError, Result};

/// Unity transformation matrix, 16.16 and 2.30 fixed point.
const UNITY_MATRIX: [u32; 9] = [0x00010000, 0, 0, 0, 0x00010000, 0, 0, 0, 0x40000000];

/// What producers read while a layout is written.
pub(crate) struct Context<'a> {
    pub(crate) session: &'a Session,
    /// Built once per trailer. Absent while the header is written.
    pub(crate) tables: Option<SampleTable<'a>>,
}

impl<'a> Context<'a> {
    pub(crate) fn header(session: &'a Session) -> Self {
        Self {
            session,
            tables: None,
        }
    }

    pub(crate) fn trailer(session: &'a Session) -> Result<Self> {
        let base = session
            .payload_base_offset()
            .ok_or_else(|| MuxError::state("sample tables need the payload offset from the header"))?;
        Ok(Self {
            session,
            tables: Some(SampleTable::build(session.frame_sizes(), base)),
        })
    }

    fn tables(&self) -> Result<&SampleTable<'a>> {
        self.tables
            .as_ref()
            .ok_or_else(|| MuxError::state("sample tables are only written in the trailer"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    FileType,
    MovieHeader,
    TrackHeader,
    MediaHeader,
    SoundHandler,
    SoundMediaHeader,
    DataReference,
    DataEntryUrl,
    SampleDescription,
    AudioSampleEntry,
    ElementaryStream,
    TimeToSample,
    SampleSize,
    SampleToChunk,
    ChunkOffset,
    MetadataHandler,
    ItemList,
}

impl Content {
    pub(crate) fn produce<W: Write + Seek>(self, w: &mut Wire<W>, ctx: &Context<'_>) -> Result<u32> {
        let session = ctx.session;
        match self {
            Content::FileType => ftyp(w),
            Content::MovieHeader => mvhd(w, session),
            Content::TrackHeader => tkhd(w, session),
            Content::MediaHeader => mdhd(w, session),
            Content::SoundHandler => hdlr(w),
            Content::SoundMediaHeader => smhd(w),
            Content::DataReference => dref(w),
            Content::DataEntryUrl => w.u32(1), // flags: self-contained
            Content::SampleDescription => stsd(w),
            Content::AudioSampleEntry => mp4a(w, session),
            Content::ElementaryStream => esds::write(
                w,
                &EsdsFields {
                    decoder_config: session.decoder_config(),
                    buffer_size: session.peak_frame_bytes(),
                    max_bitrate: session.peak_bitrate(),
                    avg_bitrate: session.average_bitrate(),
                },
            ),
            Content::TimeToSample => ctx.tables()?.write_stts(w),
            Content::SampleSize => ctx.tables()?.write_stsz(w),
            Content::SampleToChunk => ctx.tables()?.write_stsc(w),
            Content::ChunkOffset => ctx.tables()?.write_stco(w),
            Content::MetadataHandler => meta_hdlr(w),
            Content::ItemList => ilst(w, session),
        }
    }
}

/// Durations are in sample-rate units and truncated to the 32-bit field.
fn duration(session: &Session) -> u32 {
    session.total_samples().min(u32::MAX as u64) as u32
}

fn matrix<W: Write + Seek>(w: &mut Wire<W>) -> Result<u32> {
    let mut size = 0;
    for v in UNITY_MATRIX {
        size += w.u32(v)?;
    }
    Ok(size)
}

fn ftyp<W: Write + Seek>(w: &mut Wire<W>) -> Result<u32> {
    let mut size = 0;
    size += w.bytes(b"isom")?; // major brand
    size += w.u32(0)?; // minor version
    size += w.bytes(b"mp41mp42")?; // compatible brands
    Ok(size)
}

fn mvhd<W: Write + Seek>(w: &mut Wire<W>, session: &Session) -> Result<u32> {
    let now = session.creation_time();
    let mut size = 0;
    size += w.u32(0)?; // version/flags
    size += w.u32(now)?; // creation
    size += w.u32(now)?; // modification
    size += w.u32(session.params().sample_rate)?; // timescale
    size += w.u32(duration(session))?;
    size += w.u32(0x00010000)?; // rate 1.0
    size += w.u16(0x0100)?; // volume 1.0
    size += w.zeros(10)?;
    size += matrix(w)?;
    size += w.zeros(24)?; // pre_defined
    size += w.u32(2)?; // next track id
    Ok(size)
}

fn tkhd<W: Write + Seek>(w: &mut Wire<W>, session: &Session) -> Result<u32> {
    let now = session.creation_time();
    let mut size = 0;
    size += w.u8(0)?; // version
    size += w.u16(0)?; // flags 23..8
    size += w.u8(1)?; // flags 7..0: track enabled
    size += w.u32(now)?;
    size += w.u32(now)?;
    size += w.u32(1)?; // track id
    size += w.u32(0)?;
    size += w.u32(duration(session))?;
    size += w.zeros(8)?;
    size += w.u16(0)?; // layer
    size += w.u16(0)?; // alternate group
    size += w.u16(0x0100)?; // volume
    size += w.u16(0)?;
    size += matrix(w)?;
    size += w.u32(0)?; // width
    size += w.u32(0)?; // height
    Ok(size)
}

fn mdhd<W: Write + Seek>(w: &mut Wire<W>, session: &Session) -> Result<u32> {
    let now = session.creation_time();
    let mut size = 0;
    size += w.u32(0)?; // version/flags
    size += w.u32(now)?;
    size += w.u32(now)?;
    size += w.u32(session.params().sample_rate)?;
    size += w.u32(duration(session))?;
    size += w.u16(0)?; // language
    size += w.u16(0)?; // pre_defined
    Ok(size)
}

fn hdlr<W: Write + Seek>(w: &mut Wire<W>) -> Result<u32> {
    let mut size = 0;
    size += w.u32(0)?; // version/flags
    size += w.u32(0)?; // pre_defined
    size += w.bytes(b"soun")?;
    size += w.zeros(12)?; // reserved
    size += w.u8(0)?; // empty name
    Ok(size)
}

fn smhd<W: Write + Seek>(w: &mut Wire<W>) -> Result<u32> {
    let mut size = 0;
    size += w.u32(0)?; // version/flags
    size += w.u16(0)?; // balance: center
    size += w.u16(0)?;
    Ok(size)
}

fn dref<W: Write + Seek>(w: &mut Wire<W>) -> Result<u32> {
    Ok(w.u32(0)? + w.u32(1)?) // version/flags, entry count
}

fn stsd<W: Write + Seek>(w: &mut Wire<W>) -> Result<u32> {
    Ok(w.u32(0)? + w.u32(1)?) // version/flags, one mp4a entry
}

fn mp4a<W: Write + Seek>(w: &mut Wire<W>, session: &Session) -> Result<u32> {
    let params = session.params();
    let mut size = 0;
    size += w.zeros(6)?; // reserved
    size += w.u16(1)?; // data reference index
    size += w.u16(0)?; // version
    size += w.u16(0)?; // revision
    size += w.u32(0)?; // vendor
    size += w.u16(params.channels)?;
    size += w.u16(params.bit_depth)?;
    size += w.u16(0)?; // compression id
    size += w.u16(0)?; // packet size
    // 16.16 sample rate, integer part truncated to 16 bits.
    size += w.u16(params.sample_rate as u16)?;
    size += w.u16(0)?;
    Ok(size)
}

fn meta_hdlr<W: Write + Seek>(w: &mut Wire<W>) -> Result<u32> {
    let mut size = 0;
    size += w.u32(0)?; // version/flags
    size += w.u32(0)?; // pre_defined
    size += w.bytes(b"mdir")?;
    size += w.bytes(b"appl")?;
    size += w.zeros(8)?; // reserved
    size += w.u8(0)?;
    Ok(size)
}

fn ilst<W: Write + Seek>(w: &mut Wire<W>, session: &Session) -> Result<u32> {
    let mut size = 0;
    for (name, value) in session.tags().items() {
        size += tags::write_item(w, &name, value)?;
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp4::session::StreamParams;
    use std::io::Cursor;

    fn session() -> Session {
        let mut s = Session::new(StreamParams::new(48_000, 1, 16).unwrap());
        s.set_payload_base_offset(40).unwrap();
        s.set_decoder_config(&[0x11, 0x88]);
        s
    }

    fn body_len(content: Content, session: &Session) -> (u32, Vec<u8>) {
        let ctx = Context::trailer(session).unwrap();
        let mut wire = Wire::new(Cursor::new(Vec::new()));
        let n = content.produce(&mut wire, &ctx).unwrap();
        let out = wire.into_inner().into_inner();
        assert_eq!(n as usize, out.len(), "{content:?} misreported its size");
        (n, out)
    }

    #[test]
    fn fixed_body_sizes() {
        let s = session();
        assert_eq!(body_len(Content::FileType, &s).0, 16);
        assert_eq!(body_len(Content::MovieHeader, &s).0, 100);
        assert_eq!(body_len(Content::TrackHeader, &s).0, 84);
        assert_eq!(body_len(Content::MediaHeader, &s).0, 24);
        assert_eq!(body_len(Content::SoundHandler, &s).0, 25);
        assert_eq!(body_len(Content::SoundMediaHeader, &s).0, 8);
        assert_eq!(body_len(Content::DataReference, &s).0, 8);
        assert_eq!(body_len(Content::DataEntryUrl, &s).0, 4);
        assert_eq!(body_len(Content::SampleDescription, &s).0, 8);
        assert_eq!(body_len(Content::AudioSampleEntry, &s).0, 28);
        assert_eq!(body_len(Content::ElementaryStream, &s).0, 4 + 2 + 25);
        assert_eq!(body_len(Content::MetadataHandler, &s).0, 25);
    }

    #[test]
    fn file_type_brands() {
        let (_, out) = body_len(Content::FileType, &session());
        assert_eq!(&out, b"isom\0\0\0\0mp41mp42");
    }

    #[test]
    fn audio_entry_fields() {
        let (_, out) = body_len(Content::AudioSampleEntry, &session());
        assert_eq!(&out[6..8], &1u16.to_be_bytes());
        assert_eq!(&out[16..18], &1u16.to_be_bytes()); // channels
        assert_eq!(&out[18..20], &16u16.to_be_bytes()); // bits
        assert_eq!(&out[24..26], &48_000u16.to_be_bytes());
    }

    #[test]
    fn track_header_is_enabled() {
        let (_, out) = body_len(Content::TrackHeader, &session());
        assert_eq!(&out[0..4], &[0, 0, 0, 1]);
    }

    #[test]
    fn high_sample_rate_is_truncated() {
        let s = Session::new(StreamParams::new(96_000, 2, 16).unwrap());
        let ctx = Context::header(&s);
        let mut wire = Wire::new(Cursor::new(Vec::new()));
        Content::AudioSampleEntry.produce(&mut wire, &ctx).unwrap();
        let out = wire.into_inner().into_inner();
        assert_eq!(&out[24..26], &30_464u16.to_be_bytes());
    }

    #[test]
    fn tables_need_payload_offset() {
        let s = Session::new(StreamParams::new(48_000, 1, 16).unwrap());
        assert!(matches!(Context::trailer(&s), Err(MuxError::State(_))));
    }

    #[test]
    fn tables_are_trailer_only() {
        let s = session();
        let ctx = Context::header(&s);
        let mut wire = Wire::new(Cursor::new(Vec::new()));
        assert!(matches!(
            Content::ChunkOffset.produce(&mut wire, &ctx),
            Err(MuxError::State(_))
        ));
    }

    #[test]
    fn one_table_serves_every_index_box() {
        let mut s = session();
        for size in [5u32, 6, 7] {
            s.record_frame(size, 1024).unwrap();
        }
        let ctx = Context::trailer(&s).unwrap();
        assert_eq!(ctx.tables().unwrap().sizes, &[5, 6, 7]);
        assert_eq!(ctx.tables().unwrap().chunk_offsets, vec![40]);
        assert_eq!(body_len(Content::SampleSize, &s).0, 12 + 3 * 4);
        assert_eq!(body_len(Content::ChunkOffset, &s).0, 8 + 4);
    }
}
