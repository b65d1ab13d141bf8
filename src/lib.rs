/*
 *  Olympus - Discord bot serving leaderboards from a shared score spreadsheet.
 *  Copyright (C) 2025  Manuel de Castro
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */
/*
 * The package has to be a library to define a procedural macro, which is all this file does.
 */
extern crate proc_macro;
use proc_macro::TokenStream;
use quote::quote;
use quote::ToTokens as _; // To use function.into_token_stream().
use syn::spanned::Spanned as _; // To use span() on language items.
use syn::{parse_macro_input, FnArg, Ident, ItemFn, Pat};

/// Turns a `syn::Error` into the tokens reporting it, through darling for consistent diagnostics.
fn report(error: syn::Error) -> TokenStream {
    darling::Error::from(error).write_errors().into()
}

/// Identifier of a typed function argument, if its pattern is a plain identifier.
fn arg_ident(arg: &FnArg) -> Option<&Ident> {
    let FnArg::Typed(typed) = arg else {
        return None;
    };
    match &*typed.pat {
        Pat::Ident(ident) => Some(&ident.ident),
        _ => None,
    }
}

/**
 * Logs every call of a command handler through `crate::utils::elog_cmd!`.
 *
 * The logged argument must implement `crate::utils::Invocation` (a message or a poise context). By
 * default it is the first argument; `#[log_cmd(msg)]` picks the argument named `msg` instead.
 */
#[proc_macro_attribute]
pub fn log_cmd(macro_attrs: TokenStream, function: TokenStream) -> TokenStream {
    let mut function = parse_macro_input!(function as ItemFn);
    let wanted: Option<Ident> = if macro_attrs.is_empty() {
        None
    } else {
        Some(parse_macro_input!(macro_attrs as Ident))
    };

    let logged = match &wanted {
        Some(wanted) => function
            .sig
            .inputs
            .iter()
            .filter_map(arg_ident)
            .find(|ident| *ident == wanted)
            .cloned()
            .ok_or_else(|| {
                syn::Error::new(
                    wanted.span(),
                    format!("[log_cmd] the function has no argument named `{}`", wanted),
                )
            }),
        None => match function.sig.inputs.first() {
            None => Err(syn::Error::new(
                function.sig.span(),
                "[log_cmd] function must have at least one argument",
            )),
            Some(first) => arg_ident(first).cloned().ok_or_else(|| {
                syn::Error::new(
                    first.span(),
                    "[log_cmd] the first argument must be a plain identifier (not `self`)",
                )
            }),
        },
    };
    let logged = match logged {
        Ok(ident) => ident,
        Err(error) => return report(error),
    };

    // Log before anything else runs:
    let statement = match syn::parse(quote! { crate::utils::elog_cmd!(#logged); }.into()) {
        Ok(statement) => statement,
        Err(error) => return report(error),
    };
    function.block.stmts.insert(0, statement);

    function.into_token_stream().into()
}
