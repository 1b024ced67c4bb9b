//! # Accessor Derive
//!
//! Derive macros generating builder-style setters and by-value getters for
//! configuration structs with private fields.

use proc_macro::TokenStream;
use quote::{ToTokens, format_ident, quote};
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{Data, DeriveInput, Field, Fields, LitBool, parse_macro_input, spanned::Spanned};

/// Derive to generate `.set_<field>(&mut self, value: Ty) -> &mut Self` and
/// `const .with_<field>(mut self, value: Ty) -> Self` for each **named** field.
///
/// - Skipping a field: `#[setters(skip)]`
///
/// # Example
///
/// ```
/// use utils_accessors_derive::Setters;
///
/// #[derive(Setters)]
/// struct Limits {
///     frames: u32,
///     #[setters(skip)]
///     fixed: u32,
/// }
///
/// let mut l = Limits { frames: 1, fixed: 0 };
/// l.set_frames(10).set_frames(11);
/// let l2 = l.with_frames(42);
/// assert_eq!(l2.frames, 42);
/// ```
#[proc_macro_derive(Setters, attributes(setters))]
pub fn derive_generate_setters(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let fields = match named_fields(&input, "Setters") {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };

    let mut methods = Vec::new();
    for field in fields {
        let Some(fname) = &field.ident else { continue };
        if should_skip(&field.attrs, "setters") {
            continue;
        }

        let ty = &field.ty;
        let set_name = format_ident!("set_{}", fname);
        let with_name = format_ident!("with_{}", fname);

        methods.push(quote! {
            #[inline]
            pub fn #set_name(&mut self, value: #ty) -> &mut Self {
                self.#fname = value;
                self
            }

            #[inline]
            #[must_use]
            pub const fn #with_name(mut self, value: #ty) -> Self {
                self.#fname = value;
                self
            }
        });
    }

    expand(&input, &methods)
}

/// Derive to generate `const .<field>(&self) -> Ty` returning a copy of each
/// **named** field. Every non-skipped field type must be `Copy`.
///
/// - Skipping a field: `#[getters(skip)]`
///
/// # Example
///
/// ```
/// use utils_accessors_derive::Getters;
///
/// #[derive(Getters)]
/// struct Limits {
///     frames: u32,
///     #[getters(skip)]
///     label: String,
/// }
///
/// let l = Limits { frames: 7, label: String::new() };
/// assert_eq!(l.frames(), 7);
/// ```
#[proc_macro_derive(Getters, attributes(getters))]
pub fn derive_generate_getters(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let fields = match named_fields(&input, "Getters") {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };

    let mut methods = Vec::new();
    for field in fields {
        let Some(fname) = &field.ident else { continue };
        if should_skip(&field.attrs, "getters") {
            continue;
        }

        let ty = &field.ty;
        methods.push(quote! {
            #[inline]
            #[must_use]
            pub const fn #fname(&self) -> #ty {
                self.#fname
            }
        });
    }

    expand(&input, &methods)
}

fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> syn::Result<&'a Punctuated<Field, Comma>> {
    match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(n) => Ok(&n.named),
            Fields::Unnamed(u) => Err(syn::Error::new(
                u.span(),
                format!("{derive} only supports named fields"),
            )),
            Fields::Unit => Err(syn::Error::new(
                input.ident.span(),
                format!("{derive} does not apply to unit structs"),
            )),
        },
        _ => Err(syn::Error::new(
            input.ident.span(),
            format!("{derive} can only be derived for structs"),
        )),
    }
}

fn expand(input: &DeriveInput, methods: &[impl ToTokens]) -> TokenStream {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics #ident #ty_generics #where_clause {
            #(#methods)*
        }
    };

    TokenStream::from(expanded)
}

/// Accepts `#[<attr>(skip)]` and `#[<attr>(skip = true)]`.
fn should_skip(attrs: &[syn::Attribute], attr_name: &str) -> bool {
    let mut skip = false;
    for attr in attrs {
        if !attr.path().is_ident(attr_name) {
            continue;
        }

        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                if meta.input.is_empty() {
                    skip = true;
                } else if let Ok(v) = meta.value()?.parse::<LitBool>()
                    && v.value
                {
                    skip = true;
                }
            }
            Ok(())
        });
    }
    skip
}
