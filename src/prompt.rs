//! Interactive folder selection
//!
//! Reads from any [`BufRead`] and writes to any [`Write`], so the
//! library never touches the process's stdin or stdout directly.

use crate::config::ConfigStore;
use crate::error::{Error, Result};
use crate::folder::{Folder, select_by_index};
use crate::store::Store;
use std::io::{self, BufRead, Write};
use tracing::{debug, info};

/// Show `folders` as a numbered list and read an index until one is in
/// range.
///
/// Entry 0 is never offered; see
/// [`select_by_index`](crate::folder::select_by_index). Lines that are
/// not a number, or are out of range, are discarded and the question is
/// asked again.
///
/// # Errors
///
/// - [`Error::FolderNotFound`] if the listing has nothing to offer.
/// - [`Error::Io`] if input ends before a valid index is read, or if
///   writing the prompt fails.
pub fn prompt_folder_index<R: BufRead, W: Write>(
    folders: &[Folder],
    input: &mut R,
    output: &mut W,
) -> Result<usize> {
    if folders.len() < 2 {
        return Err(Error::FolderNotFound(
            "no selectable folders in listing".into(),
        ));
    }

    writeln!(output, "Available Folders")?;
    for (i, folder) in folders.iter().enumerate().skip(1) {
        writeln!(output, "{i} {folder}")?;
    }

    let mut line = String::new();
    loop {
        write!(output, "Select a folder: ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before a folder was selected",
            )));
        }

        match line.trim().parse::<usize>() {
            Ok(index) if select_by_index(folders, index).is_ok() => return Ok(index),
            _ => debug!("Discarding folder choice {:?}", line.trim()),
        }
    }
}

/// List the store's folders, ask the operator to pick one, and remember
/// the choice as `mail.imap.folder` in `config`.
///
/// # Errors
///
/// Returns an error if listing fails or [`prompt_folder_index`] does.
pub async fn select_folder_interactive<R: BufRead, W: Write>(
    store: &mut Store,
    config: &mut ConfigStore,
    input: &mut R,
    output: &mut W,
) -> Result<Folder> {
    let folders = store.list_folders().await?;
    let index = prompt_folder_index(&folders, input, output)?;
    let folder = folders[index].clone();

    config.set_imap_folder(&folder);
    info!("Selected folder {}", folder);
    Ok(folder)
}
