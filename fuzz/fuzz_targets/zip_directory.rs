#![no_main]

use libfuzzer_sys::fuzz_target;
use stratafs::backend::zip::ZipBackend;
use stratafs::{MemoryStream, OpenMode};

fuzz_target!(|data: &[u8]| {
    let stream = MemoryStream::read_only(data.to_vec());
    let Ok(backend) = ZipBackend::open(Box::new(stream)) else {
        return;
    };

    use stratafs::backend::Backend as _;

    // Exercise lookup and iteration over whatever parsed.
    let _ = backend.info("a");
    if let Ok(entries) = backend.read_dir("") {
        for entry in entries.flatten().take(64) {
            let _ = backend.open(&entry.name, OpenMode::READ);
        }
    }
});
