//! Bit-level codec: packs integers into the fewest bits their declared range
//! needs and reads them back, over any seekable byte [`Stream`](stream::Stream).
//!
//! ```
//! use bitpack::codec::{BitReader, BitWriter};
//! use bitpack::stream::{MemoryStream, SeekOrigin, Stream};
//!
//! let mut ms = MemoryStream::new();
//! let mut bw = BitWriter::new(&mut ms);
//! bw.write_in_range(5u32, 0, 7)?; // 3 bits
//! bw.write_bool(true)?;           // 1 bit
//! bw.flush()?;
//! drop(bw);
//! assert_eq!(ms.as_slice(), &[0b1011_0000]);
//!
//! ms.seek(0, SeekOrigin::Begin)?;
//! let mut br = BitReader::new(&mut ms);
//! assert_eq!(br.read_in_range(0u32, 7)?, Some(5));
//! assert_eq!(br.read_bool()?, Some(true));
//! # Ok::<(), bitpack::Error>(())
//! ```

pub mod codec;
pub mod error;
pub mod stream;

pub use codec::{BitReader, BitWriter};
pub use error::{Capability, Error, Result};
