//! Reverse device CLI Demo
//!
//! Each line typed on stdin is written to the device; the reader prints
//! what comes back. Set `REVERSE_BUFFER_SIZE` to change the buffer size.

use std::sync::Arc;

use reverser::{DeviceConfig, DeviceFile, OpenFlags, ReverseDevice, SessionError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let device = ReverseDevice::register(DeviceConfig::from_env()?)?;
    let file = Arc::new(device.open(OpenFlags::default())?);

    let writer_task = {
        let file = Arc::clone(&file);
        tokio::spawn(async move {
            write_all(&file).await;
        })
    };

    let reader_task = {
        let file = Arc::clone(&file);
        tokio::spawn(async move {
            read_all(&file).await;
        })
    };

    let _ = tokio::join!(writer_task, reader_task);

    println!("All tasks completed");
    Ok(())
}

async fn write_all(file: &DeviceFile) {
    println!("Enter text (empty line to quit):");

    let stdin = tokio::io::stdin();
    let reader = tokio::io::BufReader::new(stdin);
    let mut lines = tokio::io::AsyncBufReadExt::lines(reader);

    while let Ok(Some(line)) = lines.next_line().await {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }

        match file.write(trimmed.as_bytes()) {
            Ok(n) if n < trimmed.len() => {
                eprintln!("Short write: {n} of {} bytes", trimmed.len());
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Write error: {e} (errno={})", e.errno());
                break;
            }
        }
    }

    if let Err(e) = file.release() {
        eprintln!("Release error: {e}");
    }
    println!("Device file released");
}

async fn read_all(file: &DeviceFile) {
    let mut buf = [0u8; 64];

    loop {
        match file.read(&mut buf).await {
            Ok(n) => {
                #[allow(clippy::indexing_slicing)]
                let data = String::from_utf8_lossy(&buf[..n]);
                println!("(reversed): {data}");
            }
            Err(SessionError::Closed | SessionError::InvalidState) => {
                println!("(reader) closed");
                break;
            }
            Err(e) => {
                eprintln!("(reader) Error: {e} (errno={})", e.errno());
                break;
            }
        }
    }
}
